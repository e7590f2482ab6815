//! Reference-zone timestamps and human-relative formatting.
//!
//! The store persists naive timestamps that are implicitly in a single
//! reference zone. [`Clock`] carries that zone explicitly so nothing here
//! reads the process timezone.

use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, TimeZone, Utc};
use chrono_tz::Tz;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::fmt;

/// Format written to the database. Fixed-width so text ordering matches time ordering.
pub const STORED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Formats accepted when reading back from the database
const ACCEPTED_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted timestamp.
///
/// Text that matches neither accepted format is kept verbatim as
/// `Unparsed` and shown as-is instead of failing the surrounding read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    Parsed(NaiveDateTime),
    Unparsed(String),
}

impl Timestamp {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        ACCEPTED_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(Timestamp::Parsed)
            .unwrap_or_else(|| Timestamp::Unparsed(text.to_string()))
    }

    pub fn naive(&self) -> Option<NaiveDateTime> {
        match self {
            Timestamp::Parsed(dt) => Some(*dt),
            Timestamp::Unparsed(_) => None,
        }
    }

    /// Render with `fmt`, or return the raw text when unparsed.
    pub fn format(&self, fmt: &str) -> String {
        match self {
            Timestamp::Parsed(dt) => dt.format(fmt).to_string(),
            Timestamp::Unparsed(raw) => raw.clone(),
        }
    }

    fn to_stored(&self) -> String {
        self.format(STORED_FORMAT)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Timestamp::Parsed(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(DISPLAY_FORMAT))
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_stored()))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Text(bytes) => Timestamp::parse(&String::from_utf8_lossy(bytes)),
            ValueRef::Null => Timestamp::Unparsed(String::new()),
            ValueRef::Integer(i) => Timestamp::Unparsed(i.to_string()),
            ValueRef::Real(f) => Timestamp::Unparsed(f.to_string()),
            ValueRef::Blob(bytes) => Timestamp::Unparsed(String::from_utf8_lossy(bytes).into_owned()),
        })
    }
}

/// Source of "now" in the reference zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    zone: Tz,
}

impl Clock {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.zone)
    }

    /// Current wall-clock time in the reference zone, at the precision stored in the database.
    pub fn now_naive(&self) -> NaiveDateTime {
        self.now().naive_local().trunc_subsecs(6)
    }

    /// Attach the reference zone to a naive timestamp.
    ///
    /// Ambiguous wall times (end of DST) resolve to standard time. Wall times
    /// inside a DST gap are shifted forward by an hour.
    pub fn localize(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        self.zone
            .from_local_datetime(&naive)
            .latest()
            .or_else(|| {
                self.zone
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .unwrap_or_else(|| self.zone.from_utc_datetime(&naive))
    }

    /// Describe `timestamp` relative to now, e.g. "5 minutes ago".
    pub fn relative_description(&self, timestamp: &Timestamp) -> String {
        self.relative_description_at(timestamp, self.now())
    }

    pub fn relative_description_at(&self, timestamp: &Timestamp, now: DateTime<Tz>) -> String {
        match timestamp {
            Timestamp::Parsed(naive) => {
                let elapsed = now.signed_duration_since(self.localize(*naive));
                describe_elapsed(elapsed.num_seconds())
            }
            Timestamp::Unparsed(raw) => raw.clone(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(chrono_tz::America::Los_Angeles)
    }
}

/// Bucket an elapsed number of seconds. Negative input (a timestamp in the
/// future) is clamped to zero.
pub fn describe_elapsed(total_seconds: i64) -> String {
    let secs = total_seconds.max(0);
    let (count, unit) = if secs < 60 {
        (secs, "second")
    } else if secs < 3600 {
        (secs / 60, "minute")
    } else if secs < 86400 {
        (secs / 3600, "hour")
    } else {
        (secs / 86400, "day")
    };
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

use chrono::NaiveDateTime;
use std::fmt;
use std::path::PathBuf;

use crate::time::Timestamp;

/// Lifecycle of a work item: pending -> in_progress -> done.
///
/// `Done` drops an item from default listings but is not enforced as terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ItemStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trackable unit of work. Transient view of a `tutu_items` row.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub context: Option<String>,
    pub status: ItemStatus,
    /// Absent for items recorded before directory scoping existed
    pub working_directory: Option<PathBuf>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub first_progress_at: Option<Timestamp>,
}

impl WorkItem {
    /// Change status. The first move into `InProgress` stamps
    /// `first_progress_at`; later moves leave it untouched.
    pub fn set_status(&mut self, status: ItemStatus, now: NaiveDateTime) {
        if status == ItemStatus::InProgress && self.first_progress_at.is_none() {
            self.first_progress_at = Some(Timestamp::from(now));
        }
        self.status = status;
    }

    pub fn is_done(&self) -> bool {
        self.status == ItemStatus::Done
    }
}

/// Fields supplied when creating an item
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub context: Option<String>,
    pub working_directory: Option<PathBuf>,
}

impl NewItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = non_empty(description.into());
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = non_empty(context.into());
        self
    }

    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item() -> WorkItem {
        let created = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        WorkItem {
            id: 1,
            title: "X".to_string(),
            description: None,
            context: None,
            status: ItemStatus::Pending,
            working_directory: None,
            created_at: created.into(),
            updated_at: created.into(),
            first_progress_at: None,
        }
    }

    #[test]
    fn test_first_progress_set_once() {
        let mut item = item();
        let first = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let later = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(10, 0, 0).unwrap();

        item.set_status(ItemStatus::InProgress, first);
        assert_eq!(item.first_progress_at, Some(Timestamp::from(first)));

        item.set_status(ItemStatus::Pending, later);
        item.set_status(ItemStatus::InProgress, later);
        assert_eq!(item.first_progress_at, Some(Timestamp::from(first)));
    }

    #[test]
    fn test_done_does_not_stamp_progress() {
        let mut item = item();
        let now = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(10, 0, 0).unwrap();
        item.set_status(ItemStatus::Done, now);
        assert!(item.first_progress_at.is_none());
        assert!(item.is_done());
    }

    #[test]
    fn test_status_strings() {
        for status in [ItemStatus::Pending, ItemStatus::InProgress, ItemStatus::Done] {
            assert_eq!(ItemStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::parse("archived"), None);
    }

    #[test]
    fn test_new_item_drops_blank_text() {
        let new = NewItem::new("t").description("   \n").context("ctx");
        assert!(new.description.is_none());
        assert_eq!(new.context.as_deref(), Some("ctx"));
    }
}

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::tables;
use crate::error::StoreError;
use crate::models::{ItemStatus, StepStatus};
use crate::time::{Clock, Timestamp};

/// Handle to the on-disk store.
///
/// Opening is idempotent: tables are created when missing and older
/// databases are patched additively, never rebuilt.
pub struct Store {
    pub(super) conn: Connection,
    pub(super) clock: Clock,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P, clock: Clock) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening database at: {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn, clock)
    }

    pub fn in_memory(clock: Clock) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, clock)
    }

    fn with_connection(conn: Connection, clock: Clock) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self { conn, clock };
        store.init_schema()?;
        store.patch_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {items} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                description TEXT,
                status VARCHAR(50) DEFAULT 'pending',
                context TEXT,
                working_directory VARCHAR(1024),
                first_progress_at DATETIME,
                created_at DATETIME,
                updated_at DATETIME
            );

            CREATE TABLE IF NOT EXISTS {steps} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id INTEGER NOT NULL REFERENCES {items}(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                status VARCHAR(50) DEFAULT 'pending',
                created_at DATETIME,
                updated_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_steps_item ON {steps}(item_id);
            "#,
            items = tables::ITEMS,
            steps = tables::STEPS,
        ))?;
        Ok(())
    }

    /// Additive patches for databases created before a column existed.
    fn patch_schema(&self) -> Result<(), StoreError> {
        if !self.has_column(tables::ITEMS, "working_directory")? {
            info!("Adding working_directory column to {}", tables::ITEMS);
            self.conn.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN working_directory VARCHAR(1024)",
                    tables::ITEMS
                ),
                [],
            )?;
        } else {
            debug!("Schema up to date");
        }
        Ok(())
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for name in names {
            if name? == column {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub(super) fn now(&self) -> Timestamp {
        Timestamp::from(self.clock.now_naive())
    }
}

// ===== Column codecs =====

impl ToSql for ItemStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ItemStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            // Rows inserted without a status column value
            ValueRef::Null => Ok(ItemStatus::Pending),
            other => {
                let text = other.as_str()?;
                ItemStatus::parse(text)
                    .ok_or_else(|| FromSqlError::Other(format!("unknown item status: {text}").into()))
            }
        }
    }
}

impl ToSql for StepStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for StepStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(StepStatus::Pending),
            other => {
                let text = other.as_str()?;
                StepStatus::parse(text)
                    .ok_or_else(|| FromSqlError::Other(format!("unknown step status: {text}").into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_directory_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tutu.sqlite");
        let store = Store::open(&path, Clock::default()).unwrap();
        assert!(path.exists());
        assert!(store.has_column(tables::ITEMS, "working_directory").unwrap());
        assert!(store.has_column(tables::STEPS, "item_id").unwrap());
    }

    #[test]
    fn test_open_is_idempotent_and_keeps_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tutu.sqlite");
        {
            let store = Store::open(&path, Clock::default()).unwrap();
            store
                .conn
                .execute(
                    "INSERT INTO tutu_items (title, status) VALUES ('kept', 'pending')",
                    [],
                )
                .unwrap();
        }
        let store = Store::open(&path, Clock::default()).unwrap();
        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM tutu_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_legacy_table_gains_working_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE tutu_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title VARCHAR(255) NOT NULL,
                    description TEXT,
                    status VARCHAR(50),
                    context TEXT,
                    first_progress_at DATETIME,
                    created_at DATETIME,
                    updated_at DATETIME
                );
                INSERT INTO tutu_items (title, status, created_at, updated_at)
                VALUES ('old', 'pending', '2024-01-01 10:00:00', '2024-01-01 10:00:00');",
            )
            .unwrap();
        }
        let store = Store::open(&path, Clock::default()).unwrap();
        assert!(store.has_column(tables::ITEMS, "working_directory").unwrap());
        let item = store.get_item(1).unwrap();
        assert_eq!(item.title, "old");
        assert!(item.working_directory.is_none());
    }
}

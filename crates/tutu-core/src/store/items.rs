use rusqlite::{params, OptionalExtension, Row};
use std::path::PathBuf;
use tracing::debug;

use super::Store;
use crate::constants::tables;
use crate::error::{Entity, StoreError};
use crate::models::{ItemStatus, NewItem, WorkItem};
use crate::query::{ItemFilter, ItemQuery, Scope};

pub(super) const ITEM_COLUMNS: &str = "id, title, description, context, status, working_directory, \
     created_at, updated_at, first_progress_at";

pub(super) fn item_from_row(row: &Row<'_>) -> rusqlite::Result<WorkItem> {
    let working_directory: Option<String> = row.get(5)?;
    Ok(WorkItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        context: row.get(3)?,
        status: row.get(4)?,
        working_directory: working_directory
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from),
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        first_progress_at: row.get(8)?,
    })
}

fn dir_text(item_dir: Option<&PathBuf>) -> Option<String> {
    item_dir.map(|dir| dir.to_string_lossy().into_owned())
}

impl Store {
    // ===== Items =====

    /// Persist a new item with status `pending` and no steps.
    pub fn create_item(&self, new: NewItem) -> Result<WorkItem, StoreError> {
        let now = self.now();
        self.conn.execute(
            &format!(
                "INSERT INTO {} (title, description, context, status, working_directory, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                tables::ITEMS
            ),
            params![
                new.title,
                new.description,
                new.context,
                ItemStatus::Pending,
                dir_text(new.working_directory.as_ref()),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, "Created item");
        Ok(WorkItem {
            id,
            title: new.title,
            description: new.description,
            context: new.context,
            status: ItemStatus::Pending,
            working_directory: new.working_directory,
            created_at: now.clone(),
            updated_at: now,
            first_progress_at: None,
        })
    }

    pub fn get_item(&self, id: i64) -> Result<WorkItem, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM {} WHERE id = ?1", tables::ITEMS),
                params![id],
                item_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: Entity::Item,
                id,
            })
    }

    /// Write every mutable field and refresh `updated_at`. `created_at` is never rewritten.
    pub fn save_item(&self, item: &mut WorkItem) -> Result<(), StoreError> {
        let now = self.now();
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET title = ?1, description = ?2, context = ?3, status = ?4,
                 working_directory = ?5, first_progress_at = ?6, updated_at = ?7
                 WHERE id = ?8",
                tables::ITEMS
            ),
            params![
                item.title,
                item.description,
                item.context,
                item.status,
                dir_text(item.working_directory.as_ref()),
                item.first_progress_at,
                now,
                item.id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: Entity::Item,
                id: item.id,
            });
        }
        item.updated_at = now;
        Ok(())
    }

    /// Load, apply the status transition and save.
    pub fn update_item_status(&self, id: i64, status: ItemStatus) -> Result<WorkItem, StoreError> {
        let mut item = self.get_item(id)?;
        item.set_status(status, self.clock.now_naive());
        self.save_item(&mut item)?;
        debug!(id, status = %status, "Updated item status");
        Ok(item)
    }

    /// Delete an item together with all of its steps.
    pub fn delete_item(&self, id: i64) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        // Explicit so tables created without ON DELETE CASCADE behave the same
        tx.execute(
            &format!("DELETE FROM {} WHERE item_id = ?1", tables::STEPS),
            params![id],
        )?;
        let removed = tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1", tables::ITEMS),
            params![id],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound {
                entity: Entity::Item,
                id,
            });
        }
        tx.commit()?;
        debug!(id, "Deleted item");
        Ok(())
    }

    /// Items for display, freshest `updated_at` first.
    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<WorkItem>, StoreError> {
        self.query_items(&ItemQuery::listing(filter))
    }

    /// Pending and in-progress items within `scope`, oldest `created_at` first.
    pub fn select_for_batch(&self, scope: &Scope) -> Result<Vec<WorkItem>, StoreError> {
        self.query_items(&ItemQuery::batch(scope))
    }

    pub(crate) fn query_items(&self, query: &ItemQuery) -> Result<Vec<WorkItem>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM {} {}",
            tables::ITEMS,
            query.sql_tail()
        ))?;
        let rows = stmt.query_map([], item_from_row)?;
        let mut items = Vec::new();
        for row in rows {
            let item = row?;
            if query.retains(&item) {
                items.push(item);
            }
        }
        Ok(items)
    }

    pub(super) fn touch_item(&self, id: i64) -> Result<(), StoreError> {
        self.conn.execute(
            &format!("UPDATE {} SET updated_at = ?1 WHERE id = ?2", tables::ITEMS),
            params![self.now(), id],
        )?;
        Ok(())
    }
}

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::Store;
use crate::constants::tables;
use crate::error::{Entity, StoreError};
use crate::models::{Step, StepStatus};

const STEP_COLUMNS: &str = "id, item_id, description, status, created_at, updated_at";

fn step_from_row(row: &Row<'_>) -> rusqlite::Result<Step> {
    Ok(Step {
        id: row.get(0)?,
        item_id: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Store {
    // ===== Steps =====

    /// Attach a new pending step to an existing item.
    pub fn create_step(&self, item_id: i64, description: &str) -> Result<Step, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let exists = tx
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", tables::ITEMS),
                params![item_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound {
                entity: Entity::Item,
                id: item_id,
            });
        }

        let now = self.now();
        tx.execute(
            &format!(
                "INSERT INTO {} (item_id, description, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                tables::STEPS
            ),
            params![item_id, description, StepStatus::Pending, now],
        )?;
        let id = tx.last_insert_rowid();
        self.touch_item(item_id)?;
        tx.commit()?;
        debug!(id, item_id, "Created step");

        Ok(Step {
            id,
            item_id,
            description: description.to_string(),
            status: StepStatus::Pending,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn get_step(&self, id: i64) -> Result<Step, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {STEP_COLUMNS} FROM {} WHERE id = ?1", tables::STEPS),
                params![id],
                step_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: Entity::Step,
                id,
            })
    }

    /// Persist a step's description and status, refreshing its `updated_at`
    /// and its owning item's.
    pub fn save_step(&self, step: &mut Step) -> Result<(), StoreError> {
        let now = self.now();
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET description = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
                tables::STEPS
            ),
            params![step.description, step.status, now, step.id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: Entity::Step,
                id: step.id,
            });
        }
        self.touch_item(step.item_id)?;
        step.updated_at = now;
        Ok(())
    }

    /// Mark a step done. Steps never move back to pending.
    pub fn complete_step(&self, id: i64) -> Result<Step, StoreError> {
        let mut step = self.get_step(id)?;
        step.status = StepStatus::Done;
        self.save_step(&mut step)?;
        Ok(step)
    }

    /// Steps of an item in creation order.
    pub fn steps_for(&self, item_id: i64) -> Result<Vec<Step>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STEP_COLUMNS} FROM {} WHERE item_id = ?1 ORDER BY id ASC",
            tables::STEPS
        ))?;
        let rows = stmt.query_map(params![item_id], step_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)
    }
}

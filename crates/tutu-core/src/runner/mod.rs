//! Driving the external assistant: single-item sessions and sequential batches.

pub mod assistant;
pub mod batch;
pub mod context;

use std::path::Path;
use tracing::info;

pub use assistant::{Assistant, AssistantOutput, AssistantRequest, CommandAssistant, RunMode};
pub use batch::{BatchResult, BatchRunner};
pub use context::build_context;

use crate::error::RunError;
use crate::models::ItemStatus;
use crate::store::Store;

/// Start an interactive assistant session for one item from `cwd`.
///
/// The item is moved to `in_progress` before launching. If the launch
/// fails the status change stays in place.
pub fn start_item<A: Assistant>(
    store: &Store,
    assistant: &A,
    id: i64,
    cwd: &Path,
    appendix: Option<&str>,
) -> Result<AssistantOutput, RunError> {
    let item = store.update_item_status(id, ItemStatus::InProgress)?;
    let steps = store.steps_for(id)?;
    let context = build_context(&item, &steps, appendix);
    info!("Starting assistant session for item #{}", id);
    let output = assistant.run(&AssistantRequest {
        context: &context,
        working_dir: cwd,
        mode: RunMode::Interactive,
    })?;
    Ok(output)
}

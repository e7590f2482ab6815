use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::assistant::{Assistant, AssistantOutput, AssistantRequest, RunMode};
use super::context::build_context;
use crate::constants::FAILED_EXIT_CODE;
use crate::models::{ItemStatus, Step, WorkItem};
use crate::store::Store;

/// Outcome of processing one item in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// Item as re-read after the assistant finished
    pub item: WorkItem,
    /// All steps at that point, in creation order
    pub steps: Vec<Step>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub completed_steps: Vec<Step>,
}

impl BatchResult {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Drives the assistant over a selection of items, strictly one at a time.
///
/// Failures are recorded per item and never stop the batch.
pub struct BatchRunner<'a, A: Assistant> {
    store: &'a Store,
    assistant: &'a A,
    fallback_dir: PathBuf,
    appendix: Option<String>,
}

impl<'a, A: Assistant> BatchRunner<'a, A> {
    /// `fallback_dir` is used for items without a recorded working directory.
    pub fn new(store: &'a Store, assistant: &'a A, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            assistant,
            fallback_dir: fallback_dir.into(),
            appendix: None,
        }
    }

    pub fn with_appendix(mut self, appendix: Option<String>) -> Self {
        self.appendix = appendix;
        self
    }

    pub fn run(&self, items: &[WorkItem]) -> Vec<BatchResult> {
        self.run_with(items, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_start(index, item)` before each item.
    pub fn run_with<F>(&self, items: &[WorkItem], mut on_start: F) -> Vec<BatchResult>
    where
        F: FnMut(usize, &WorkItem),
    {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            on_start(index, item);
            info!(
                "Processing item #{} ({}/{}): {}",
                item.id,
                index + 1,
                items.len(),
                item.title
            );
            let result = self.process(item);
            if !result.succeeded() {
                warn!(
                    "Item #{} finished with exit code {}",
                    item.id, result.exit_code
                );
            }
            results.push(result);
        }
        results
    }

    fn process(&self, selected: &WorkItem) -> BatchResult {
        let started = match self
            .store
            .update_item_status(selected.id, ItemStatus::InProgress)
        {
            Ok(item) => item,
            Err(e) => {
                warn!("Could not start item #{}: {}", selected.id, e);
                return failed(selected.clone(), Vec::new(), String::new(), e.to_string());
            }
        };
        let steps = self.store.steps_for(started.id).unwrap_or_else(|e| {
            warn!("Could not load steps for item #{}: {}", started.id, e);
            Vec::new()
        });

        let context = build_context(&started, &steps, self.appendix.as_deref());
        let working_dir: &Path = started
            .working_directory
            .as_deref()
            .unwrap_or(self.fallback_dir.as_path());
        let request = AssistantRequest {
            context: &context,
            working_dir,
            mode: RunMode::Captured,
        };
        let outcome = self.assistant.run(&request);

        // The assistant may have changed status or steps through its own tools
        let item = self.store.get_item(started.id).unwrap_or(started);
        let steps = self.store.steps_for(item.id).unwrap_or(steps);

        match outcome {
            Ok(AssistantOutput {
                stdout,
                stderr,
                exit_code,
            }) => {
                let completed_steps = steps.iter().filter(|s| s.is_done()).cloned().collect();
                BatchResult {
                    item,
                    steps,
                    stdout,
                    stderr,
                    exit_code,
                    completed_steps,
                }
            }
            Err(e) => {
                warn!("Assistant failed for item #{}: {}", item.id, e);
                let (partial_stdout, partial_stderr) = e.partial_output();
                let mut stderr = partial_stderr.to_string();
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&e.to_string());
                failed(item, steps, partial_stdout.to_string(), stderr)
            }
        }
    }
}

/// `stderr` ends with the failure description.
fn failed(item: WorkItem, steps: Vec<Step>, stdout: String, stderr: String) -> BatchResult {
    let completed_steps = steps.iter().filter(|s| s.is_done()).cloned().collect();
    BatchResult {
        item,
        steps,
        stdout,
        stderr,
        exit_code: FAILED_EXIT_CODE,
        completed_steps,
    }
}

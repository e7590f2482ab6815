use std::path::Path;

use tempfile::tempdir;
use tutu_core::error::LaunchError;
use tutu_core::report::{render_report, ReportSummary};
use tutu_core::runner::{Assistant, AssistantOutput, AssistantRequest, BatchRunner};
use tutu_core::{Clock, ItemFilter, ItemStatus, NewItem, Scope, Store};

struct Acknowledge;

impl Assistant for Acknowledge {
    fn run(&self, request: &AssistantRequest<'_>) -> Result<AssistantOutput, LaunchError> {
        Ok(AssistantOutput {
            stdout: format!("read {} bytes", request.context.len()),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

#[test]
fn nested_item_is_selected_processed_and_reported() {
    let dir = tempdir().unwrap();
    let store = Store::open(dir.path().join("tutu.sqlite"), Clock::default()).unwrap();

    let item = store
        .create_item(NewItem::new("X").working_directory("/a/b"))
        .unwrap();
    let first = store.create_step(item.id, "one").unwrap();
    store.create_step(item.id, "two").unwrap();
    store.complete_step(first.id).unwrap();

    let selected = store.select_for_batch(&Scope::current("/a")).unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, item.id);

    let results = BatchRunner::new(&store, &Acknowledge, "/").run(&selected);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].item.status, ItemStatus::InProgress);
    assert_eq!(results[0].completed_steps.len(), 1);
    assert_eq!(results[0].completed_steps[0].description, "one");

    let html = render_report(&results, &selected, Clock::default().now_naive());
    assert!(html.contains("#1 X"));
    assert_eq!(
        ReportSummary::from_results(&results, &selected).steps_completed,
        1
    );
}

#[test]
fn data_survives_reopening_the_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("tutu.sqlite");
    let id = {
        let store = Store::open(&path, Clock::default()).unwrap();
        let item = store
            .create_item(NewItem::new("persist").working_directory("/w"))
            .unwrap();
        store.create_step(item.id, "s").unwrap();
        item.id
    };

    let store = Store::open(&path, Clock::default()).unwrap();
    let listed = store
        .list_items(&ItemFilter::new(false, Scope::current("/w")))
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(store.steps_for(id).unwrap().len(), 1);
}

#[cfg(unix)]
#[test]
fn failing_child_does_not_block_later_items() {
    use tutu_core::runner::CommandAssistant;

    let dir = tempdir().unwrap();
    let store = Store::in_memory(Clock::default()).unwrap();
    let missing = dir.path().join("gone");
    store
        .create_item(NewItem::new("bad dir").working_directory(&missing))
        .unwrap();
    store
        .create_item(NewItem::new("good").working_directory(dir.path()))
        .unwrap();

    let selected = store.select_for_batch(&Scope::Everywhere).unwrap();
    let assistant = CommandAssistant::new("cat", Vec::new());
    let results = BatchRunner::new(&store, &assistant, Path::new("/")).run(&selected);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].exit_code, -1);
    assert!(!results[0].stderr.is_empty());
    assert_eq!(results[1].exit_code, 0);
    assert!(results[1].stdout.starts_with("# Item #2: good"));
}

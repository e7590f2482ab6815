//! Terminal rendering for `list` and `status`.

use std::fmt::Write;

use tutu_core::{Clock, ItemStatus, Step, WorkItem};

use crate::{BOLD, CYAN, DIM, GREEN, RESET, YELLOW};

const TITLE_WIDTH: usize = 40;

fn status_color(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => YELLOW,
        ItemStatus::InProgress => CYAN,
        ItemStatus::Done => GREEN,
    }
}

/// Shorten to `max` characters, marking the cut with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

pub fn item_table(rows: &[(&WorkItem, Vec<Step>)], clock: &Clock) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{BOLD}{:>5}  {:<width$}  {:<11}  {:>5}  {}{RESET}",
        "ID",
        "Title",
        "Status",
        "Steps",
        "Updated",
        width = TITLE_WIDTH
    );
    for (item, steps) in rows {
        let done = steps.iter().filter(|s| s.is_done()).count();
        let _ = writeln!(
            out,
            "{:>5}  {:<width$}  {}{:<11}{RESET}  {:>5}  {DIM}{}{RESET}",
            item.id,
            truncate(&item.title, TITLE_WIDTH),
            status_color(item.status),
            item.status.as_str(),
            format!("{}/{}", done, steps.len()),
            clock.relative_description(&item.updated_at),
            width = TITLE_WIDTH
        );
    }
    out
}

pub fn item_status(item: &WorkItem, steps: &[Step], clock: &Clock) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{BOLD}📋 #{} {}{RESET}", item.id, item.title);
    let _ = writeln!(
        out,
        "Status: {}{}{RESET}",
        status_color(item.status),
        item.status
    );
    if let Some(dir) = &item.working_directory {
        let _ = writeln!(out, "Directory: {}", dir.display());
    }
    let _ = writeln!(
        out,
        "Created: {} {DIM}({}){RESET}",
        item.created_at,
        clock.relative_description(&item.created_at)
    );
    let _ = writeln!(
        out,
        "Updated: {} {DIM}({}){RESET}",
        item.updated_at,
        clock.relative_description(&item.updated_at)
    );
    if let Some(first) = &item.first_progress_at {
        let _ = writeln!(
            out,
            "First progress: {} {DIM}({}){RESET}",
            first,
            clock.relative_description(first)
        );
    }
    if let Some(description) = &item.description {
        let _ = writeln!(out, "\n{BOLD}Description:{RESET}\n{}", description);
    }
    if let Some(context) = &item.context {
        let _ = writeln!(out, "\n{BOLD}Context:{RESET}\n{}", context);
    }

    let done = steps.iter().filter(|s| s.is_done()).count();
    let _ = writeln!(out, "\n{BOLD}Steps ({}/{}):{RESET}", done, steps.len());
    if steps.is_empty() {
        let _ = writeln!(out, "  {DIM}No steps defined yet.{RESET}");
    }
    for step in steps {
        let marker = if step.is_done() { "✅" } else { "⬜" };
        let _ = writeln!(out, "  {} #{} {}", marker, step.id, step.description);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutu_core::{NewItem, Store};

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn test_table_shows_step_progress() {
        let store = Store::in_memory(Clock::default()).unwrap();
        let item = store.create_item(NewItem::new("Write docs")).unwrap();
        let step = store.create_step(item.id, "outline").unwrap();
        store.create_step(item.id, "draft").unwrap();
        store.complete_step(step.id).unwrap();

        let item = store.get_item(item.id).unwrap();
        let rows = vec![(&item, store.steps_for(item.id).unwrap())];
        let table = item_table(&rows, store.clock());
        assert!(table.contains("Write docs"));
        assert!(table.contains("1/2"));
        assert!(table.contains("ago"));
    }

    #[test]
    fn test_status_lists_steps_in_order() {
        let store = Store::in_memory(Clock::default()).unwrap();
        let item = store
            .create_item(NewItem::new("Refactor").description("split module"))
            .unwrap();
        store.create_step(item.id, "first").unwrap();
        store.create_step(item.id, "second").unwrap();

        let steps = store.steps_for(item.id).unwrap();
        let text = item_status(&item, &steps, store.clock());
        assert!(text.contains("split module"));
        assert!(text.contains("Steps (0/2)"));
        let header = text.find("Steps (").unwrap();
        let first = text.find("#1 first").unwrap();
        let second = text.find("#2 second").unwrap();
        assert!(header < first);
        assert!(first < second);
    }
}

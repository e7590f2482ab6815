use std::fmt::Write;

use crate::models::{Step, WorkItem};

/// Render the text handed to the assistant for one item.
///
/// Steps are listed in the order given (creation order from the store).
pub fn build_context(item: &WorkItem, steps: &[Step], appendix: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Item #{}: {}", item.id, item.title);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Status: {}", item.status);
    let _ = writeln!(out);
    let dir = item
        .working_directory
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "(not recorded)".to_string());
    let _ = writeln!(out, "## Working Directory: {}", dir);
    let _ = writeln!(out, "## Created: {}", item.created_at);
    if let Some(first) = &item.first_progress_at {
        let _ = writeln!(out, "## First Progress: {}", first);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Description:");
    let _ = writeln!(out, "{}", item.description.as_deref().unwrap_or(""));
    let _ = writeln!(out);
    let _ = writeln!(out, "## Context:");
    let _ = writeln!(out, "{}", item.context.as_deref().unwrap_or(""));
    let _ = writeln!(out);
    let _ = writeln!(out, "## Steps:");
    if steps.is_empty() {
        let _ = writeln!(out, "No steps defined yet.");
    }
    for step in steps {
        let marker = if step.is_done() { "x" } else { " " };
        let _ = writeln!(out, "- [{}] Step #{}: {}", marker, step.id, step.description);
    }
    if let Some(appendix) = appendix {
        let _ = write!(out, "\n---\n\n{}", appendix);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemStatus, StepStatus};
    use crate::time::Timestamp;
    use std::path::PathBuf;

    fn item() -> WorkItem {
        let ts = Timestamp::parse("2024-05-01 09:30:00");
        WorkItem {
            id: 12,
            title: "Ship it".to_string(),
            description: Some("Release 1.0".to_string()),
            context: Some("See CHANGELOG".to_string()),
            status: ItemStatus::InProgress,
            working_directory: Some(PathBuf::from("/src/app")),
            created_at: ts.clone(),
            updated_at: ts,
            first_progress_at: None,
        }
    }

    fn step(id: i64, description: &str, status: StepStatus) -> Step {
        let ts = Timestamp::parse("2024-05-01 09:31:00");
        Step {
            id,
            item_id: 12,
            description: description.to_string(),
            status,
            created_at: ts.clone(),
            updated_at: ts,
        }
    }

    #[test]
    fn test_context_lists_steps_with_markers() {
        let steps = [
            step(1, "tag release", StepStatus::Done),
            step(2, "publish", StepStatus::Pending),
        ];
        let text = build_context(&item(), &steps, None);
        assert!(text.starts_with("# Item #12: Ship it\n"));
        assert!(text.contains("## Status: in_progress"));
        assert!(text.contains("## Working Directory: /src/app"));
        assert!(text.contains("## Description:\nRelease 1.0\n"));
        assert!(text.contains("## Context:\nSee CHANGELOG\n"));
        let tagged = text.find("- [x] Step #1: tag release").unwrap();
        let publish = text.find("- [ ] Step #2: publish").unwrap();
        assert!(tagged < publish);
        assert!(!text.contains("---"));
    }

    #[test]
    fn test_context_without_steps_or_directory() {
        let mut item = item();
        item.working_directory = None;
        let text = build_context(&item, &[], Some("README body"));
        assert!(text.contains("No steps defined yet."));
        assert!(text.contains("(not recorded)"));
        assert!(text.ends_with("\n---\n\nREADME body"));
    }
}

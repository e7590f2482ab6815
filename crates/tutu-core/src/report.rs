//! Static HTML report for a batch run.

use chrono::NaiveDateTime;
use std::fmt::Write;
use std::io;
use std::path::{Path, PathBuf};

use crate::constants::REPORT_FILE_PREFIX;
use crate::models::{ItemStatus, WorkItem};
use crate::runner::BatchResult;

/// Headline numbers shown at the top of the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub total_selected: usize,
    pub done: usize,
    pub in_progress: usize,
    pub steps_completed: usize,
}

impl ReportSummary {
    pub fn from_results(results: &[BatchResult], selected: &[WorkItem]) -> Self {
        Self {
            total_selected: selected.len(),
            done: count_status(results, ItemStatus::Done),
            in_progress: count_status(results, ItemStatus::InProgress),
            steps_completed: results.iter().map(|r| r.completed_steps.len()).sum(),
        }
    }
}

fn count_status(results: &[BatchResult], status: ItemStatus) -> usize {
    results.iter().filter(|r| r.item.status == status).count()
}

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; margin: 0; background: #f4f5f7; color: #1f2328; }
header { background: #24292f; color: #fff; padding: 24px 32px; }
header h1 { margin: 0 0 4px 0; font-size: 24px; }
header .generated { color: #afb8c1; font-size: 13px; }
main { max-width: 960px; margin: 0 auto; padding: 24px 32px; }
.summary { display: flex; gap: 16px; margin-bottom: 24px; }
.stat { flex: 1; background: #fff; border-radius: 8px; padding: 16px; box-shadow: 0 1px 2px rgba(0,0,0,.08); }
.stat .value { font-size: 28px; font-weight: 600; }
.stat .label { color: #57606a; font-size: 13px; }
.item { background: #fff; border-radius: 8px; padding: 20px; margin-bottom: 16px; box-shadow: 0 1px 2px rgba(0,0,0,.08); }
.item h2 { margin: 0 0 8px 0; font-size: 18px; }
.meta { color: #57606a; font-size: 13px; margin-bottom: 12px; }
.badge { display: inline-block; padding: 2px 8px; border-radius: 12px; font-size: 12px; font-weight: 600; }
.badge.pending { background: #fff8c5; color: #7d4e00; }
.badge.in_progress { background: #ddf4ff; color: #0550ae; }
.badge.done { background: #dafbe1; color: #116329; }
.exit { margin-left: 8px; font-size: 12px; color: #57606a; }
.exit.failed { color: #cf222e; font-weight: 600; }
.steps { list-style: none; padding-left: 0; }
.steps li { padding: 2px 0; }
.text { white-space: pre-wrap; }
pre { background: #f6f8fa; padding: 12px; border-radius: 6px; overflow-x: auto; white-space: pre-wrap; }
pre.stderr { background: #ffebe9; color: #82071e; }
details summary { cursor: pointer; color: #0969da; }
"#;

/// Render the batch report as a single self-contained HTML document.
///
/// Output depends only on the inputs; `generated_at` is the only time shown.
pub fn render_report(
    results: &[BatchResult],
    selected: &[WorkItem],
    generated_at: NaiveDateTime,
) -> String {
    let summary = ReportSummary::from_results(results, selected);
    let mut html = String::new();

    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang=\"en\">");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>Tutu Batch Report</title>");
    let _ = writeln!(html, "<style>{}</style>", STYLE);
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "<header>");
    let _ = writeln!(html, "<h1>Tutu Batch Report</h1>");
    let _ = writeln!(
        html,
        "<div class=\"generated\">Generated at {}</div>",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(html, "</header>");
    let _ = writeln!(html, "<main>");

    let _ = writeln!(html, "<section class=\"summary\">");
    for (value, label) in [
        (summary.total_selected, "Items selected"),
        (summary.done, "Done"),
        (summary.in_progress, "In progress"),
        (summary.steps_completed, "Steps completed"),
    ] {
        let _ = writeln!(
            html,
            "<div class=\"stat\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>",
            value, label
        );
    }
    let _ = writeln!(html, "</section>");

    for result in results {
        render_result(&mut html, result);
    }

    let _ = writeln!(html, "</main>");
    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");
    html
}

fn render_result(html: &mut String, result: &BatchResult) {
    let item = &result.item;
    let _ = writeln!(html, "<article class=\"item\" id=\"item-{}\">", item.id);
    let _ = writeln!(
        html,
        "<h2>#{} {} <span class=\"badge {status}\">{status}</span>{}</h2>",
        item.id,
        escape_html(&item.title),
        exit_marker(result.exit_code),
        status = item.status.as_str(),
    );
    let dir = item
        .working_directory
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "(not recorded)".to_string());
    let _ = writeln!(
        html,
        "<div class=\"meta\">📁 {}</div>",
        escape_html(&dir)
    );

    if let Some(description) = &item.description {
        let _ = writeln!(
            html,
            "<h3>Description</h3>\n<div class=\"text\">{}</div>",
            escape_html(description)
        );
    }
    if let Some(context) = &item.context {
        let _ = writeln!(
            html,
            "<h3>Context</h3>\n<div class=\"text\">{}</div>",
            escape_html(context)
        );
    }

    if !result.steps.is_empty() {
        let _ = writeln!(html, "<h3>Steps</h3>");
        let _ = writeln!(html, "<ul class=\"steps\">");
        for step in &result.steps {
            let icon = if step.is_done() { "✅" } else { "⬜" };
            let _ = writeln!(
                html,
                "<li>{} #{} {}</li>",
                icon,
                step.id,
                escape_html(&step.description)
            );
        }
        let _ = writeln!(html, "</ul>");
    }

    let _ = writeln!(html, "<details>");
    let _ = writeln!(html, "<summary>Output</summary>");
    let _ = writeln!(html, "<pre>{}</pre>", escape_html(&result.stdout));
    let _ = writeln!(html, "</details>");
    if !result.stderr.trim().is_empty() {
        let _ = writeln!(html, "<h3>Errors</h3>");
        let _ = writeln!(
            html,
            "<pre class=\"stderr\">{}</pre>",
            escape_html(&result.stderr)
        );
    }
    let _ = writeln!(html, "</article>");
}

fn exit_marker(exit_code: i32) -> String {
    if exit_code == 0 {
        String::new()
    } else {
        format!(
            "<span class=\"exit failed\">exit code {}</span>",
            exit_code
        )
    }
}

/// Escape HTML special characters
pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// `tutu_report_YYYYMMDD_HHMMSS.html`
pub fn report_file_name(at: NaiveDateTime) -> String {
    format!("{}{}.html", REPORT_FILE_PREFIX, at.format("%Y%m%d_%H%M%S"))
}

/// Write the report into `dir` and return its path.
pub fn write_report(dir: &Path, at: NaiveDateTime, html: &str) -> io::Result<PathBuf> {
    let path = dir.join(report_file_name(at));
    std::fs::write(&path, html)?;
    Ok(path)
}

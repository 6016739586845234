//! Console rendering of plans, progress and summaries, and the JSON report.

use anyhow::Context;
use dbsetup_core::{ExecutionPlan, ExecutionSummary, ProgressEvent};
use std::io::{self, Write};
use std::path::Path;

/// One line per discovered file: verdict, classification, path and reason.
///
/// # Errors
/// Returns any error from the writer.
pub fn write_plan(plan: &ExecutionPlan, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Target framework: {}", plan.target.label())?;
    for entry in &plan.entries {
        let classification = entry
            .classification
            .map_or("-", |framework| framework.as_str());
        writeln!(
            out,
            "  {:<4}  {:<8}  {}  ({})",
            if entry.included { "RUN" } else { "SKIP" },
            classification,
            entry.file.relative_path(),
            entry.reason.describe()
        )?;
    }
    writeln!(
        out,
        "{} of {} files would run",
        plan.included_count(),
        plan.entries.len()
    )
}

/// Progress line for a finished file; `None` for start events.
pub fn format_progress(event: &ProgressEvent<'_>) -> Option<String> {
    match event {
        ProgressEvent::Started { .. } => None,
        ProgressEvent::Finished { outcome, .. } => {
            let status = if outcome.success { "OK" } else { "FAIL" };
            Some(format!(
                "[{:>3}%] {:<4} {}",
                event.percent(),
                status,
                outcome.relative_path
            ))
        }
    }
}

/// Prints progress to stdout.
pub fn print_progress(event: ProgressEvent<'_>) {
    if let Some(line) = format_progress(&event) {
        println!("{}", line);
    }
}

/// Failed files with their errors, then the totals.
///
/// # Errors
/// Returns any error from the writer.
pub fn write_summary(summary: &ExecutionSummary, out: &mut impl Write) -> io::Result<()> {
    if summary.failed > 0 {
        writeln!(out, "\nFailed files:")?;
        for outcome in summary.failures() {
            writeln!(
                out,
                "  {}: {}",
                outcome.relative_path,
                outcome.error.as_deref().unwrap_or("unknown error")
            )?;
        }
    }
    writeln!(
        out,
        "\nSummary: {} succeeded, {} failed ({} ms)",
        summary.succeeded,
        summary.failed,
        summary.duration_ms()
    )
}

/// Writes the summary as JSON.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub async fn write_report(summary: &ExecutionSummary, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

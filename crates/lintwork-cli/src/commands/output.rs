//! Machine-readable output formats.

use anyhow::Result;
use lintwork::AnalysisOutcome;

use crate::OutputFormat;

/// Prints the outcome. `Text` is echoed by the engine itself and prints
/// nothing here.
pub fn print(outcome: &AnalysisOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {}
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Compact => print!("{}", render_compact(outcome)),
    }
    Ok(())
}

/// `file:line[:column]: P<priority> [rule] message`, one line each.
fn render_compact(outcome: &AnalysisOutcome) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    for v in &outcome.report.violations {
        let column = v.column.map(|c| format!(":{c}")).unwrap_or_default();
        let _ = writeln!(
            out,
            "{}:{}{}: P{} [{}] {}",
            v.file.display(),
            v.line,
            column,
            v.priority,
            v.rule,
            v.message
        );
    }
    for e in &outcome.report.processing_errors {
        let _ = writeln!(out, "{}: error: {}", e.file.display(), e.message);
    }
    out
}

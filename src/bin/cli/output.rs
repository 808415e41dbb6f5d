//! Output formatting for check reports
//!
//! Formats reports as human-readable text or JSON

use crate::OutputFormat;
use protected_by::{Diagnostic, Report, Stats};
use serde::Serialize;

/// Format a report
pub fn format_report(report: &Report, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_human(report),
        OutputFormat::Json => format_json(report),
    }
}

/// One `file:line:column: message` line per diagnostic, then a summary
fn format_human(report: &Report) -> String {
    let mut output = String::new();

    for diagnostic in &report.diagnostics {
        output.push_str(&format!("{}\n", diagnostic));
    }

    if !report.diagnostics.is_empty() {
        output.push('\n');
    }
    output.push_str(&format!(
        "check result: {}. {} diagnostics; {} files; {} protected fields; {} accesses\n",
        if report.is_clean() { "ok" } else { "FAILED" },
        report.diagnostics.len(),
        report.stats.units,
        report.stats.bindings,
        report.stats.usages,
    ));

    output
}

/// JSON document: a summary object plus one object per diagnostic
#[derive(Serialize)]
struct JsonReport<'a> {
    summary: JsonSummary<'a>,
    diagnostics: &'a [Diagnostic],
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    #[serde(flatten)]
    stats: &'a Stats,
    diagnostics: usize,
}

/// Format as JSON
fn format_json(report: &Report) -> String {
    let output = JsonReport {
        summary: JsonSummary {
            stats: &report.stats,
            diagnostics: report.diagnostics.len(),
        },
        diagnostics: &report.diagnostics,
    };

    let mut text = serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

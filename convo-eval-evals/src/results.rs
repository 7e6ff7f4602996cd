//! Scored results as a CSV table.
//!
//! One row per (conversation, metric), with a blank row after every second
//! metric row of a conversation so pairs of metrics read as a block in a
//! spreadsheet.

use crate::error::EvalResult;
use crate::evaluator::MetricResult;
use crate::report::{ConversationResult, EvaluationReport};
use crate::tabular::{csv_section, ROW_TERMINATOR};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Header row of the results table.
pub const RESULTS_HEADER: [&str; 7] = [
    "convo_url",
    "overall_success",
    "metric_name",
    "score",
    "reason",
    "evaluation_cost",
    "retrieval_context",
];

/// Default base URL for conversation links.
pub const DEFAULT_CONVERSATION_URL_BASE: &str =
    "https://gametime.kustomerapp.com/app/conversations";

/// Link to a conversation in the support app.
#[must_use]
pub fn conversation_url(app_url: &str, conversation_id: &str) -> String {
    format!("{}/{}", app_url.trim_end_matches('/'), conversation_id)
}

fn format_bool(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

fn format_float(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

fn metric_row(
    app_url: &str,
    result: &ConversationResult,
    metric: &MetricResult,
) -> EvalResult<[String; 7]> {
    let context = match &result.retrieval_context {
        Some(context) => serde_json::to_string(context)?,
        None => String::new(),
    };
    let reason = metric
        .reason
        .clone()
        .or_else(|| metric.error.clone())
        .unwrap_or_default();

    Ok([
        conversation_url(app_url, result.conversation_id.as_str()),
        format_bool(metric.success),
        metric.name.clone(),
        format_float(metric.score),
        reason,
        format_float(metric.evaluation_cost),
        context,
    ])
}

/// Write the results table for a report. Returns the number of metric rows.
pub fn write_results<W: Write>(
    out: &mut W,
    report: &EvaluationReport,
    app_url: &str,
) -> EvalResult<usize> {
    let mut rows = 0;
    {
        let mut header = csv_section(out);
        header.write_record(RESULTS_HEADER)?;
        header.flush()?;
    }

    for result in &report.conversations {
        for pair in result.metrics.chunks(2) {
            {
                let mut section = csv_section(out);
                for metric in pair {
                    section.write_record(&metric_row(app_url, result, metric)?)?;
                    rows += 1;
                }
                section.flush()?;
            }
            if pair.len() == 2 {
                out.write_all(ROW_TERMINATOR)?;
            }
        }
    }
    Ok(rows)
}

/// Write the results table to a file, creating parent directories as needed.
pub fn write_results_file(
    path: impl AsRef<Path>,
    report: &EvaluationReport,
    app_url: &str,
) -> EvalResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    let rows = write_results(&mut out, report, app_url)?;
    out.flush()?;

    info!(path = %path.display(), rows, "wrote evaluation results");
    Ok(())
}

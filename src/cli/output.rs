//! Output formatting utilities for the CLI.

use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::domain::models::{DiagnosticRecord, IterationHistory, IterationOutcome};

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to a maximum number of characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner for slow operations (oracle calls, pipeline waits).
///
/// Hidden in JSON mode so machine-readable output stays clean.
pub fn create_spinner(message: impl Into<String>, json_mode: bool) -> ProgressBar {
    if json_mode {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        spinner.set_style(style.tick_chars(SPINNER_CHARS));
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Ask a yes/no question on stderr; anything but y/yes is a no.
pub fn confirm(prompt: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{} [y/N] ", style(prompt).bold()))
        .context("Failed to write prompt")?;
    let answer = term.read_line().context("Failed to read answer")?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

const fn outcome_color(outcome: IterationOutcome) -> Color {
    match outcome {
        IterationOutcome::Success => Color::Green,
        IterationOutcome::FixPushed => Color::Cyan,
        IterationOutcome::LowConfidence | IterationOutcome::Timeout => Color::Yellow,
        IterationOutcome::ApplyFailed
        | IterationOutcome::PushFailed
        | IterationOutcome::MaxIterations
        | IterationOutcome::OracleFailed => Color::Red,
    }
}

/// Render an iteration history as a table.
pub fn history_table(history: &IterationHistory) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["#", "Outcome", "Confidence", "Branch", "Run", "Detail"]
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

    for record in history.records() {
        table.add_row(vec![
            Cell::new(record.label()),
            Cell::new(record.outcome).fg(outcome_color(record.outcome)),
            Cell::new(
                record
                    .confidence
                    .map_or_else(|| "-".to_string(), |c| c.to_string()),
            ),
            Cell::new(record.branch.as_deref().unwrap_or("-")),
            Cell::new(record.run_id.as_ref().map_or("-", |id| id.as_str())),
            Cell::new(truncate(record.detail.as_deref().unwrap_or(""), 60)),
        ]);
    }

    table.to_string()
}

/// Human rendering of a validated diagnostic record.
pub fn render_record(record: &DiagnosticRecord) -> String {
    let mut lines = vec![format!("Mode: {}", record.mode)];
    if let Some(confidence) = record.effective_confidence() {
        lines.push(format!("Confidence: {confidence}"));
    }
    if let Some(risk) = record.risk_level {
        lines.push(format!("Risk: {risk}"));
    }
    if let Some(summary) = &record.summary {
        lines.push(format!("Summary: {summary}"));
    }
    if !record.hypotheses.is_empty() {
        lines.push("Hypotheses:".to_string());
        let mut ranked: Vec<_> = record.hypotheses.iter().collect();
        ranked.sort_by_key(|h| h.rank);
        for h in ranked {
            let refs: Vec<&str> = h.evidence_refs.iter().map(String::as_str).collect();
            lines.push(format!(
                "  {}. [{}] {} ({})",
                h.rank,
                h.confidence,
                h.title,
                if refs.is_empty() { "-".to_string() } else { refs.join(", ") }
            ));
        }
    }
    if let Some(explanation) = &record.explanation {
        lines.push(String::new());
        lines.push(explanation.clone());
    }
    if let Some(patch) = &record.patch {
        lines.push(String::new());
        lines.push(format!(
            "Patch: {}",
            record.description.as_deref().unwrap_or("(no description)")
        ));
        lines.push(patch.trim_end().to_string());
    }
    for warning in &record.warnings {
        lines.push(format!("{} {warning}", style("warning:").yellow()));
    }
    lines.join("\n")
}

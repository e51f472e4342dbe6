//! `remedy history`

use anyhow::{anyhow, Result};
use clap::Args;
use serde::Serialize;

use crate::adapters::record_cache::RecordCache;
use crate::cli::output::{history_table, output, CommandOutput};
use crate::domain::models::{Config, HistorySummary, IterationHistory};

#[derive(Args, Debug)]
pub struct HistoryArgs {}

#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    pub summary: HistorySummary,
    pub records: IterationHistory,
}

impl HistoryOutput {
    pub fn new(history: IterationHistory) -> Self {
        Self {
            summary: history.summary(),
            records: history,
        }
    }
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.records.is_empty() {
            return "No iterations recorded.".to_string();
        }
        let outcome = self
            .summary
            .outcome
            .map_or_else(|| "in progress".to_string(), |o| o.to_string());
        let mut text = history_table(&self.records);
        text.push_str(&format!(
            "\n\nOutcome: {outcome} after {} iteration(s), {} fix(es) pushed",
            self.summary.iterations, self.summary.fixes_pushed
        ));
        if let Some(reason) = &self.summary.reason {
            text.push_str(&format!("\nReason: {reason}"));
        }
        text
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(_args: HistoryArgs, config: &Config, json_mode: bool) -> Result<()> {
    let cache = RecordCache::from_config(&config.cache)
        .ok_or_else(|| anyhow!("Caching is disabled; no history is kept"))?;
    let history = cache.load_history().await?.unwrap_or_default();
    output(&HistoryOutput::new(history), json_mode);
    Ok(())
}

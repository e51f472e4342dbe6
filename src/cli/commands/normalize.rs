//! `remedy normalize`

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::commands::read_input;
use crate::cli::output::{output, CommandOutput};
use crate::services::diff_normalizer;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Diff file (stdin when omitted)
    pub file: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct NormalizeOutput {
    pub text: String,
    pub hunk_count: usize,
    pub repaired_headers: usize,
}

impl CommandOutput for NormalizeOutput {
    fn to_human(&self) -> String {
        // `output` adds the final newline back.
        self.text.strip_suffix('\n').unwrap_or(&self.text).to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: NormalizeArgs, json_mode: bool) -> Result<()> {
    let input = read_input(args.file.as_deref()).await?;
    let normalized = diff_normalizer::normalize_with_stats(&input);
    tracing::debug!(
        hunks = normalized.hunk_count,
        repaired = normalized.repaired_headers,
        "Normalized diff"
    );

    let out = NormalizeOutput {
        text: normalized.text,
        hunk_count: normalized.hunk_count,
        repaired_headers: normalized.repaired_headers,
    };
    output(&out, json_mode);
    Ok(())
}

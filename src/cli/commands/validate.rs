//! `remedy validate`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::commands::read_input;
use crate::cli::output::{output, render_record, CommandOutput};
use crate::domain::models::{DiagnosticMode, DiagnosticRecord, EvidenceBundle};
use crate::services::oracle_client::validate_response;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Evidence bundle the response was produced from
    #[arg(long)]
    pub bundle: PathBuf,

    /// Mode the oracle was asked for
    #[arg(long)]
    pub mode: DiagnosticMode,

    /// Raw oracle response (stdin when omitted)
    pub response: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ValidateOutput {
    pub valid: bool,
    pub record: DiagnosticRecord,
}

impl CommandOutput for ValidateOutput {
    fn to_human(&self) -> String {
        format!("Response is valid.\n\n{}", render_record(&self.record))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: ValidateArgs, json_mode: bool) -> Result<()> {
    let bundle = EvidenceBundle::from_json_file(&args.bundle)
        .with_context(|| format!("Failed to load bundle {}", args.bundle.display()))?;
    let raw = read_input(args.response.as_deref()).await?;

    let record = validate_response(&raw, &bundle, args.mode).context("Response rejected")?;
    output(&ValidateOutput { valid: true, record }, json_mode);
    Ok(())
}

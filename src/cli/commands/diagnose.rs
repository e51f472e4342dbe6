//! `remedy diagnose`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::evidence_command::CommandEvidenceCollector;
use crate::adapters::github_actions::GitHubActionsClient;
use crate::adapters::http_oracle::HttpOracle;
use crate::adapters::record_cache::RecordCache;
use crate::cli::commands::git_repository;
use crate::cli::output::{create_spinner, output, render_record, CommandOutput};
use crate::domain::models::{Config, DiagnosticMode, DiagnosticRecord, EvidenceBundle};
use crate::domain::ports::{EvidenceCollector, PipelineProvider, SourceRepository};
use crate::services::oracle_client::OracleClient;

#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// What to ask the oracle for (defaults to convergence.oracle_mode)
    #[arg(long)]
    pub mode: Option<DiagnosticMode>,

    /// Use this evidence bundle instead of collecting one
    #[arg(long)]
    pub bundle: Option<PathBuf>,

    /// Branch whose latest run is diagnosed (defaults to the checked-out branch)
    #[arg(long)]
    pub branch: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagnoseOutput {
    pub record: DiagnosticRecord,
    pub cached: bool,
}

impl CommandOutput for DiagnoseOutput {
    fn to_human(&self) -> String {
        let mut text = render_record(&self.record);
        if self.cached && self.record.patch.is_some() {
            text.push_str("\n\nRun `remedy fix` to apply this patch.");
        }
        text
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

async fn collect_bundle(config: &Config, branch: Option<String>) -> Result<EvidenceBundle> {
    let branch = match branch {
        Some(branch) => branch,
        None => git_repository(config)
            .current_branch()
            .await
            .context("Failed to determine the current branch")?,
    };

    let pipeline = GitHubActionsClient::from_config(&config.pipeline)?;
    let run = pipeline
        .latest_run(&branch)
        .await?
        .ok_or_else(|| anyhow!("No pipeline runs found for branch '{branch}'"))?;
    if run.succeeded() {
        warn!(run = %run.id, "Latest run succeeded; diagnosing anyway");
    }

    let collector = CommandEvidenceCollector::from_config(&config.evidence)?;
    Ok(collector.collect(&run, &branch).await?)
}

pub async fn execute(args: DiagnoseArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mode = args.mode.unwrap_or(config.convergence.oracle_mode);

    let bundle = match &args.bundle {
        Some(path) => EvidenceBundle::from_json_file(path)
            .with_context(|| format!("Failed to load bundle {}", path.display()))?,
        None => {
            let spinner = create_spinner("Collecting evidence...", json_mode);
            let bundle = collect_bundle(config, args.branch.clone()).await;
            spinner.finish_and_clear();
            bundle?
        }
    };
    info!(items = bundle.len(), %mode, "Requesting diagnosis");

    let client = OracleClient::new(Arc::new(HttpOracle::from_config(&config.oracle)?));
    let spinner = create_spinner(format!("Asking the oracle ({mode})..."), json_mode);
    let record = client.diagnose(&bundle, mode).await;
    spinner.finish_and_clear();
    let record = record.context("Diagnosis failed")?;

    let cached = match RecordCache::from_config(&config.cache) {
        Some(cache) => {
            cache
                .save_record(&record)
                .await
                .context("Failed to cache diagnostic record")?;
            true
        }
        None => false,
    };

    output(&DiagnoseOutput { record, cached }, json_mode);
    Ok(())
}

//! `remedy watch`

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::warn;

use crate::adapters::evidence_command::CommandEvidenceCollector;
use crate::adapters::github_actions::GitHubActionsClient;
use crate::adapters::http_oracle::HttpOracle;
use crate::adapters::record_cache::RecordCache;
use crate::cli::commands::git_repository;
use crate::cli::commands::history::HistoryOutput;
use crate::cli::output::{create_spinner, output};
use crate::domain::models::{Config, IterationOutcome};
use crate::domain::ports::SourceRepository;
use crate::services::convergence_controller::ConvergenceController;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Branch to watch (defaults to the checked-out branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Override convergence.max_iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

pub async fn execute(args: WatchArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(max) = args.max_iterations {
        config.convergence.max_iterations = max;
    }

    let repo = Arc::new(git_repository(&config));
    let branch = match args.branch {
        Some(branch) => branch,
        None => repo
            .current_branch()
            .await
            .context("Failed to determine the current branch")?,
    };

    let controller = ConvergenceController::new(
        repo,
        Arc::new(GitHubActionsClient::from_config(&config.pipeline)?),
        Arc::new(HttpOracle::from_config(&config.oracle)?),
        Arc::new(CommandEvidenceCollector::from_config(&config.evidence)?),
        &config,
    );

    let spinner = create_spinner(format!("Watching {branch}..."), json_mode);
    let history = controller
        .run_observed(&branch, |record| {
            spinner.set_message(format!(
                "iteration {}: {}",
                record.label(),
                record.outcome
            ));
        })
        .await;
    spinner.finish_and_clear();
    let history = history.context("Remediation loop could not start")?;

    if let Some(cache) = RecordCache::from_config(&config.cache) {
        if let Err(e) = cache.save_history(&history).await {
            warn!(error = %e, "Failed to cache iteration history");
        }
    }

    let summary = history.summary();
    output(&HistoryOutput::new(history), json_mode);

    match summary.outcome {
        Some(IterationOutcome::Success) => Ok(()),
        Some(outcome) => bail!("Remediation ended with outcome '{outcome}'"),
        None => bail!("Remediation ended without a terminal outcome"),
    }
}

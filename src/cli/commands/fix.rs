//! `remedy fix`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::Serialize;

use crate::adapters::record_cache::RecordCache;
use crate::cli::commands::git_repository;
use crate::cli::output::{confirm, output, CommandOutput};
use crate::domain::models::{Config, DiagnosticRecord};
use crate::domain::ports::SourceRepository;
use crate::services::oracle_client::validate_record;
use crate::services::safe_apply_gate::{DryRunReport, GateOutcome, GateState, SafeApplyGate};

#[derive(Args, Debug)]
pub struct FixArgs {
    /// Diagnostic record JSON (defaults to the cached record from `remedy diagnose`)
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Stop after policy and dry-run validation
    #[arg(long)]
    pub dry_run: bool,

    /// Push the fix branch after committing
    #[arg(long)]
    pub push: bool,
}

#[derive(Debug, Serialize)]
pub struct FixOutput {
    pub dry_run: bool,
    pub branch: String,
    pub commit: Option<String>,
    pub pushed: bool,
    pub hunk_count: usize,
    pub repaired_headers: usize,
    pub states: Vec<GateState>,
}

impl From<DryRunReport> for FixOutput {
    fn from(report: DryRunReport) -> Self {
        Self {
            dry_run: true,
            branch: report.branch,
            commit: None,
            pushed: false,
            hunk_count: report.proposal.hunk_count,
            repaired_headers: report.proposal.repaired_headers,
            states: report.states,
        }
    }
}

impl From<GateOutcome> for FixOutput {
    fn from(outcome: GateOutcome) -> Self {
        Self {
            dry_run: false,
            branch: outcome.branch,
            commit: Some(outcome.commit),
            pushed: false,
            hunk_count: outcome.proposal.hunk_count,
            repaired_headers: outcome.proposal.repaired_headers,
            states: outcome.states,
        }
    }
}

impl CommandOutput for FixOutput {
    fn to_human(&self) -> String {
        let trail: Vec<&str> = self.states.iter().map(GateState::as_str).collect();
        let mut lines = vec![if self.dry_run {
            format!("Dry run passed; the fix would be committed on {}", self.branch)
        } else {
            format!("Fix committed on {}", self.branch)
        }];
        if let Some(commit) = &self.commit {
            lines.push(format!("Commit: {commit}"));
        }
        lines.push(format!(
            "Hunks: {} ({} header(s) repaired)",
            self.hunk_count, self.repaired_headers
        ));
        lines.push(format!("States: {}", trail.join(" -> ")));
        if self.pushed {
            lines.push("Pushed.".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Load the record to apply and re-check it against the contract; a record
/// read from disk is untrusted until it passes.
async fn load_record(args: &FixArgs, config: &Config) -> Result<DiagnosticRecord> {
    let record: DiagnosticRecord = if let Some(path) = &args.record {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse record {}", path.display()))?
    } else {
        let cache = RecordCache::from_config(&config.cache)
            .ok_or_else(|| anyhow!("Caching is disabled; pass --record"))?;
        cache.load_record().await?.ok_or_else(|| {
            anyhow!("No cached record. Run `remedy diagnose` first or pass --record")
        })?
    };
    validate_record(&record)?;
    Ok(record)
}

pub async fn execute(args: FixArgs, config: &Config, json_mode: bool) -> Result<()> {
    let record = load_record(&args, config).await?;
    let repo = Arc::new(git_repository(config));
    let gate = SafeApplyGate::new(Arc::clone(&repo), config.gate.clone());
    let threshold = config.policy.interactive_min_confidence;

    let report = gate
        .dry_run(&record, threshold)
        .await
        .context("Fix rejected")?;
    if args.dry_run {
        output(&FixOutput::from(report), json_mode);
        return Ok(());
    }

    if !args.yes && !json_mode {
        eprintln!("{}", record.patch.as_deref().unwrap_or_default().trim_end());
        if !confirm(&format!("Apply \"{}\" on a new branch?", record.headline()))? {
            bail!("Aborted");
        }
    }

    let outcome = gate.execute(&record, threshold).await.context("Fix failed")?;
    let branch = outcome.branch.clone();
    let mut out = FixOutput::from(outcome);

    if args.push {
        repo.push_branch(&config.gate.remote, &branch)
            .await
            .with_context(|| format!("Failed to push {branch}"))?;
        out.pushed = true;
    }

    output(&out, json_mode);
    Ok(())
}

//! Safe-Apply Gate.
//!
//! The only component allowed to mutate the working tree. A diagnostic
//! record travels through a fixed sequence of states:
//!
//! ```text
//! Proposed -> PolicyChecked -> DryRunValidated -> BranchCreated -> Applied -> Committed
//!    |              |                 |                  |             |
//!    +--------------+-----> Rejected  +------------------+--> RolledBack
//! ```
//!
//! Rejection happens before any write. Once the fix branch exists every
//! failure is rolled back: changes discarded, the prior branch checked out
//! again, and the fix branch deleted.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainResult, RemediationError};
use crate::domain::models::{DiagnosticRecord, GateConfig, PatchProposal};
use crate::domain::ports::SourceRepository;
use crate::services::diff_normalizer;

/// Gate lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Proposed,
    PolicyChecked,
    DryRunValidated,
    BranchCreated,
    Applied,
    Committed,
    Rejected,
    RolledBack,
}

impl GateState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::PolicyChecked => "policy_checked",
            Self::DryRunValidated => "dry_run_validated",
            Self::BranchCreated => "branch_created",
            Self::Applied => "applied",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Pass,
    Reject(String),
}

impl PolicyDecision {
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A fix that made it all the way to `Committed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateOutcome {
    pub branch: String,
    pub commit: String,
    /// Branch that was checked out before the gate ran.
    pub base_branch: String,
    pub proposal: PatchProposal,
    pub states: Vec<GateState>,
}

/// A fix that passed policy and dry-run validation without touching the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    pub branch: String,
    pub proposal: PatchProposal,
    pub states: Vec<GateState>,
}

/// Safe-apply gate over a [`SourceRepository`].
pub struct SafeApplyGate<R: SourceRepository + ?Sized> {
    repo: Arc<R>,
    config: GateConfig,
    /// Held for the whole validate-to-commit sequence.
    tree_lock: Mutex<()>,
}

impl<R: SourceRepository + ?Sized> SafeApplyGate<R> {
    pub fn new(repo: Arc<R>, config: GateConfig) -> Self {
        Self {
            repo,
            config,
            tree_lock: Mutex::new(()),
        }
    }

    pub const fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Confidence and risk policy. There is no override.
    pub fn check_policy(record: &DiagnosticRecord, min_confidence: u8) -> PolicyDecision {
        if record.is_high_risk() {
            return PolicyDecision::Reject("risk level is HIGH".to_string());
        }
        match record.effective_confidence() {
            None => PolicyDecision::Reject("record carries no confidence".to_string()),
            Some(c) if c < min_confidence => PolicyDecision::Reject(format!(
                "confidence {c} is below the required {min_confidence}"
            )),
            Some(_) => PolicyDecision::Pass,
        }
    }

    /// Normalize the record's patch into a proposal.
    pub fn prepare(record: &DiagnosticRecord) -> DomainResult<PatchProposal> {
        let raw = record
            .patch
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| RemediationError::DryRunFailure("record carries no patch".to_string()))?;

        let normalized = diff_normalizer::normalize_with_stats(raw);
        if normalized.repaired_headers > 0 {
            debug!(
                hunks = normalized.hunk_count,
                repaired = normalized.repaired_headers,
                "Repaired hunk headers"
            );
        }

        Ok(PatchProposal {
            normalized_text: normalized.text,
            hunk_count: normalized.hunk_count,
            repaired_headers: normalized.repaired_headers,
            description: record.headline().to_string(),
        })
    }

    /// Dry-run validation. Never mutates the tree.
    pub async fn validate(&self, proposal: &PatchProposal, branch: &str) -> DomainResult<()> {
        validate_branch_name(branch)?;
        if self.is_protected(branch) {
            return Err(RemediationError::PolicyRejected(format!(
                "branch '{branch}' is protected"
            )));
        }
        if proposal.is_empty() {
            return Err(RemediationError::DryRunFailure("patch is empty".to_string()));
        }
        if !self.repo.is_clean().await? {
            return Err(RemediationError::DryRunFailure(
                "working tree has uncommitted changes".to_string(),
            ));
        }
        self.repo
            .check_patch(&proposal.normalized_text)
            .await
            .map_err(|e| RemediationError::DryRunFailure(e.to_string()))
    }

    /// Run policy and dry-run validation only.
    pub async fn dry_run(
        &self,
        record: &DiagnosticRecord,
        min_confidence: u8,
    ) -> DomainResult<DryRunReport> {
        let _guard = self.tree_lock.lock().await;
        let branch = branch_name_for(&self.config.branch_prefix, Utc::now());
        let mut states = vec![GateState::Proposed];

        let proposal = self
            .authorize(record, min_confidence, &branch, &mut states)
            .await?;

        Ok(DryRunReport {
            branch,
            proposal,
            states,
        })
    }

    /// Gate, apply, and commit a record on a fresh branch named for now.
    pub async fn execute(
        &self,
        record: &DiagnosticRecord,
        min_confidence: u8,
    ) -> DomainResult<GateOutcome> {
        self.execute_at(record, min_confidence, Utc::now()).await
    }

    /// Gate, apply, and commit a record on a branch named for `at`.
    #[instrument(skip(self, record), fields(mode = %record.mode))]
    pub async fn execute_at(
        &self,
        record: &DiagnosticRecord,
        min_confidence: u8,
        at: DateTime<Utc>,
    ) -> DomainResult<GateOutcome> {
        let _guard = self.tree_lock.lock().await;
        let branch = branch_name_for(&self.config.branch_prefix, at);
        let mut states = vec![GateState::Proposed];

        let proposal = self
            .authorize(record, min_confidence, &branch, &mut states)
            .await?;

        let base_branch = self.repo.current_branch().await?;
        if self.repo.branch_exists(&branch).await? {
            warn!(branch = %branch, "Fix branch already exists");
            return Err(RemediationError::BranchCollision(branch));
        }
        self.repo.create_branch(&branch).await.map_err(|e| match e {
            RemediationError::Git(detail) if detail.contains("already exists") => {
                RemediationError::BranchCollision(branch.clone())
            }
            other => other,
        })?;
        states.push(GateState::BranchCreated);
        info!(branch = %branch, base = %base_branch, "Created fix branch");

        match self.apply_and_commit(&proposal, &mut states).await {
            Ok(commit) => {
                info!(branch = %branch, commit = %commit, "Fix committed");
                Ok(GateOutcome {
                    branch,
                    commit,
                    base_branch,
                    proposal,
                    states,
                })
            }
            Err(cause) => {
                warn!(branch = %branch, error = %cause, "Apply failed, rolling back");
                self.rollback(&base_branch, &branch).await.map_err(|detail| {
                    RemediationError::RollbackFailure {
                        cause: cause.to_string(),
                        detail: detail.to_string(),
                    }
                })?;
                Err(cause)
            }
        }
    }

    async fn authorize(
        &self,
        record: &DiagnosticRecord,
        min_confidence: u8,
        branch: &str,
        states: &mut Vec<GateState>,
    ) -> DomainResult<PatchProposal> {
        if let PolicyDecision::Reject(reason) = Self::check_policy(record, min_confidence) {
            states.push(GateState::Rejected);
            info!(reason = %reason, "Policy rejected fix");
            return Err(RemediationError::PolicyRejected(reason));
        }
        states.push(GateState::PolicyChecked);

        let proposal = Self::prepare(record).inspect_err(|_| states.push(GateState::Rejected))?;
        if let Err(e) = self.validate(&proposal, branch).await {
            states.push(GateState::Rejected);
            info!(error = %e, "Dry-run validation rejected fix");
            return Err(e);
        }
        states.push(GateState::DryRunValidated);
        Ok(proposal)
    }

    async fn apply_and_commit(
        &self,
        proposal: &PatchProposal,
        states: &mut Vec<GateState>,
    ) -> DomainResult<String> {
        self.repo
            .apply_patch(&proposal.normalized_text)
            .await
            .map_err(|e| RemediationError::ApplyFailure(e.to_string()))?;
        states.push(GateState::Applied);

        self.repo
            .stage_all()
            .await
            .map_err(|e| RemediationError::ApplyFailure(e.to_string()))?;
        let message = format!("{} {}", self.config.commit_prefix, proposal.description);
        let commit = self
            .repo
            .commit(&message)
            .await
            .map_err(|e| RemediationError::ApplyFailure(e.to_string()))?;
        states.push(GateState::Committed);
        Ok(commit)
    }

    async fn rollback(&self, base_branch: &str, branch: &str) -> DomainResult<()> {
        self.repo.discard_changes().await?;
        self.repo.switch_branch(base_branch).await?;
        self.repo.delete_branch(branch).await?;
        info!(branch = %branch, base = %base_branch, "Rolled back fix branch");
        Ok(())
    }

    fn is_protected(&self, branch: &str) -> bool {
        self.config.protected_branches.iter().any(|p| p == branch)
    }
}

/// `<prefix>/<YYYYMMDD-HHMMSS>` in UTC.
pub fn branch_name_for(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), at.format("%Y%m%d-%H%M%S"))
}

/// Validates a git branch name before it reaches a git command line.
///
/// Follows `git check-ref-format` rules closely enough to reject anything that
/// could be read as a flag.
pub fn validate_branch_name(name: &str) -> DomainResult<()> {
    let invalid = |why: &str| {
        Err(RemediationError::PolicyRejected(format!(
            "invalid branch name '{name}': {why}"
        )))
    };
    if name.is_empty() {
        return Err(RemediationError::PolicyRejected(
            "branch name cannot be empty".to_string(),
        ));
    }
    if name.starts_with('-') {
        return invalid("must not start with '-'");
    }
    if name.contains("..") || name.contains("//") || name.contains("@{") {
        return invalid("contains a forbidden sequence");
    }
    if name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
        return invalid("bad leading or trailing character");
    }
    if let Some(ch) = name.chars().find(|ch| {
        ch.is_ascii_control() || matches!(ch, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\')
    }) {
        return invalid(&format!("contains disallowed character '{ch}'"));
    }
    if name.ends_with(".lock") {
        return invalid("must not end with '.lock'");
    }
    Ok(())
}

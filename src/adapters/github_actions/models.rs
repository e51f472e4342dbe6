//! GitHub Actions API response models.
//!
//! These map the subset of the workflow runs payload the adapter reads. They
//! are not part of the domain model.

use serde::Deserialize;

use crate::domain::models::{RunConclusion, RunHandle, RunStatus};

/// `GET /repos/{owner}/{repo}/actions/runs`
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunsResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// One workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    /// queued, in_progress, completed, waiting, requested, pending
    pub status: String,
    /// success, failure, cancelled, timed_out, action_required, neutral,
    /// skipped, stale, or null while running.
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl WorkflowRun {
    pub fn run_status(&self) -> RunStatus {
        match self.status.as_str() {
            "completed" => RunStatus::Completed,
            "queued" | "waiting" | "requested" | "pending" => RunStatus::Queued,
            _ => RunStatus::InProgress,
        }
    }

    /// Anything that is not a pass is a failure; there is no third verdict.
    pub fn run_conclusion(&self) -> RunConclusion {
        match self.conclusion.as_deref() {
            None if self.run_status() != RunStatus::Completed => RunConclusion::Unset,
            Some("success" | "neutral" | "skipped") => RunConclusion::Success,
            _ => RunConclusion::Failure,
        }
    }

    pub fn to_handle(&self) -> RunHandle {
        RunHandle::new(self.id, self.run_status(), self.run_conclusion())
    }
}

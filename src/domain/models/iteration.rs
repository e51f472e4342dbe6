//! Iteration history models.
//!
//! The history is the sole source of truth for what a convergence run did.
//! Records are appended once and never mutated; any post-hoc summary is
//! derived from the records alone.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::run::RunId;

/// Caller-visible outcome of one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IterationOutcome {
    /// The pipeline is green.
    Success,
    /// The oracle's confidence was below the unattended threshold.
    LowConfidence,
    /// The safe-apply gate rejected or failed to apply the fix.
    ApplyFailed,
    /// The fix branch could not be pushed.
    PushFailed,
    /// The pipeline did not produce an observable result before the deadline.
    Timeout,
    /// The iteration bound was reached with the pipeline still failing.
    MaxIterations,
    /// Evidence collection or the oracle call failed, or the response violated the contract.
    OracleFailed,
    /// A fix was pushed but the new run failed; the loop continues.
    FixPushed,
}

impl IterationOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::LowConfidence => "low-confidence",
            Self::ApplyFailed => "apply-failed",
            Self::PushFailed => "push-failed",
            Self::Timeout => "timeout",
            Self::MaxIterations => "max-iterations",
            Self::OracleFailed => "oracle-failed",
            Self::FixPushed => "fix-pushed",
        }
    }

    /// Whether this outcome ends the convergence loop.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::FixPushed)
    }
}

impl fmt::Display for IterationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appended history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration index.
    pub index: u32,
    /// Synthetic record marking success observed after a pushed fix (`index.5`).
    #[serde(default)]
    pub half_step: bool,
    pub outcome: IterationOutcome,
    #[serde(default)]
    pub confidence: Option<u8>,
    /// Human-readable reason or detail for the outcome.
    #[serde(default)]
    pub detail: Option<String>,
    /// Fix branch created during this iteration, if any.
    #[serde(default)]
    pub branch: Option<String>,
    /// Run observed at the end of this iteration, if any.
    #[serde(default)]
    pub run_id: Option<RunId>,
    pub recorded_at: DateTime<Utc>,
}

impl IterationRecord {
    pub fn new(index: u32, outcome: IterationOutcome) -> Self {
        Self {
            index,
            half_step: false,
            outcome,
            confidence: None,
            detail: None,
            branch: None,
            run_id: None,
            recorded_at: Utc::now(),
        }
    }

    /// Synthetic `index.5` success record.
    pub fn half_step_success(index: u32) -> Self {
        Self {
            half_step: true,
            ..Self::new(index, IterationOutcome::Success)
        }
    }

    #[must_use]
    pub const fn with_confidence(mut self, confidence: Option<u8>) -> Self {
        self.confidence = confidence;
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn with_run(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Display label: `3` or `3.5` for half-step records.
    pub fn label(&self) -> String {
        if self.half_step {
            format!("{}.5", self.index)
        } else {
            self.index.to_string()
        }
    }
}

/// Append-only, ordered iteration history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IterationHistory {
    records: Vec<IterationRecord>,
}

/// Summary derived from a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySummary {
    pub outcome: Option<IterationOutcome>,
    pub reason: Option<String>,
    pub iterations: u32,
    pub fixes_pushed: usize,
    pub branches: Vec<String>,
}

impl IterationHistory {
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    /// Outcome of the last record when it is terminal.
    pub fn final_outcome(&self) -> Option<IterationOutcome> {
        self.last()
            .map(|r| r.outcome)
            .filter(IterationOutcome::is_terminal)
    }

    /// Number of distinct (non-half-step) iterations recorded.
    pub fn iteration_count(&self) -> u32 {
        self.records
            .iter()
            .filter(|r| !r.half_step)
            .map(|r| r.index)
            .max()
            .unwrap_or(0)
    }

    pub fn summary(&self) -> HistorySummary {
        // A half-step record names the branch its own iteration already listed.
        let branches: Vec<String> = self
            .records
            .iter()
            .filter(|r| !r.half_step)
            .filter_map(|r| r.branch.clone())
            .collect();
        let fixes_pushed = self
            .records
            .iter()
            .filter(|r| !r.half_step && r.branch.is_some())
            .filter(|r| {
                matches!(
                    r.outcome,
                    IterationOutcome::FixPushed
                        | IterationOutcome::MaxIterations
                        | IterationOutcome::Timeout
                        | IterationOutcome::Success
                )
            })
            .count();

        HistorySummary {
            outcome: self.final_outcome(),
            reason: self.last().and_then(|r| r.detail.clone()),
            iterations: self.iteration_count(),
            fixes_pushed,
            branches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_names() {
        let json = serde_json::to_string(&IterationOutcome::LowConfidence).unwrap();
        assert_eq!(json, "\"low-confidence\"");
        let json = serde_json::to_string(&IterationOutcome::MaxIterations).unwrap();
        assert_eq!(json, "\"max-iterations\"");
        assert!(!IterationOutcome::FixPushed.is_terminal());
        assert!(IterationOutcome::Timeout.is_terminal());
    }

    #[test]
    fn test_half_step_label() {
        assert_eq!(IterationRecord::new(2, IterationOutcome::FixPushed).label(), "2");
        assert_eq!(IterationRecord::half_step_success(2).label(), "2.5");
    }

    #[test]
    fn test_summary_from_history() {
        let mut history = IterationHistory::new();
        history.append(
            IterationRecord::new(1, IterationOutcome::FixPushed)
                .with_confidence(Some(90))
                .with_branch("remedy/20260101-000001"),
        );
        history.append(
            IterationRecord::new(2, IterationOutcome::FixPushed)
                .with_confidence(Some(88))
                .with_branch("remedy/20260101-000502"),
        );
        history.append(
            IterationRecord::half_step_success(2)
                .with_branch("remedy/20260101-000502")
                .with_detail("run 99 succeeded"),
        );

        let summary = history.summary();
        assert_eq!(summary.outcome, Some(IterationOutcome::Success));
        assert_eq!(summary.reason.as_deref(), Some("run 99 succeeded"));
        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.fixes_pushed, 2);
        assert_eq!(
            summary.branches,
            vec!["remedy/20260101-000001", "remedy/20260101-000502"]
        );
    }

    #[test]
    fn test_final_outcome_ignores_non_terminal_tail() {
        let mut history = IterationHistory::new();
        assert_eq!(history.final_outcome(), None);
        history.append(IterationRecord::new(1, IterationOutcome::FixPushed));
        assert_eq!(history.final_outcome(), None);
        history.append(IterationRecord::new(2, IterationOutcome::PushFailed));
        assert_eq!(history.final_outcome(), Some(IterationOutcome::PushFailed));
    }
}

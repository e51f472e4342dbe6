//! Pipeline run models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque run identity assigned by the pipeline provider.
///
/// Identities are the only ordering-free invariant the provider guarantees;
/// they are compared for equality and never for recency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for RunId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RunId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

impl RunStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

/// Final verdict of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunConclusion {
    Success,
    Failure,
    /// Not yet concluded.
    Unset,
}

impl RunConclusion {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Unset => "unset",
        }
    }
}

/// Snapshot of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    pub id: RunId,
    pub status: RunStatus,
    pub conclusion: RunConclusion,
}

impl RunHandle {
    pub fn new(id: impl Into<RunId>, status: RunStatus, conclusion: RunConclusion) -> Self {
        Self {
            id: id.into(),
            status,
            conclusion,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Completed with a successful conclusion.
    pub fn succeeded(&self) -> bool {
        self.is_completed() && self.conclusion == RunConclusion::Success
    }
}

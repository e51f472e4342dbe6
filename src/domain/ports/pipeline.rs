//! Pipeline provider port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{RunHandle, RunId};

/// Read-only view of the CI pipeline.
///
/// Every call is a fresh query; callers never cache a [`RunHandle`] beyond
/// comparing its identity.
#[async_trait]
pub trait PipelineProvider: Send + Sync {
    /// Most recent run for `branch`, or `None` when the branch has no runs.
    async fn latest_run(&self, branch: &str) -> DomainResult<Option<RunHandle>>;

    /// Current state of a specific run.
    async fn run(&self, id: &RunId) -> DomainResult<Option<RunHandle>>;
}

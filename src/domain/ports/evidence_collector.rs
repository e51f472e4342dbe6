//! Evidence collector port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{EvidenceBundle, RunHandle};

/// Gathers repository metadata, run logs, and workflow definitions for a run.
///
/// Text in the returned bundle is expected to be scrubbed of credentials.
#[async_trait]
pub trait EvidenceCollector: Send + Sync {
    async fn collect(&self, run: &RunHandle, branch: &str) -> DomainResult<EvidenceBundle>;
}

//! Oracle port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{DiagnosticMode, EvidenceBundle};

/// The external reasoning service.
///
/// Implementations return the raw response text untouched. Nothing the oracle
/// returns is trusted until the oracle client has validated it against the
/// diagnostic contract.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Ask the oracle to diagnose the failure described by `bundle`.
    async fn request(&self, bundle: &EvidenceBundle, mode: DiagnosticMode) -> DomainResult<String>;
}

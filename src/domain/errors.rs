//! Domain errors for the remediation engine.

use thiserror::Error;

/// Errors that can occur while diagnosing, gating, applying, or verifying a fix.
///
/// Every variant is caught at the iteration boundary by the convergence
/// controller and converted into a terminal iteration outcome.
#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("Oracle contract violation: {0}")]
    ContractViolation(String),

    #[error("Policy rejected the proposed fix: {0}")]
    PolicyRejected(String),

    #[error("Dry-run validation failed: {0}")]
    DryRunFailure(String),

    #[error("Patch application failed: {0}")]
    ApplyFailure(String),

    #[error("Rollback failed after {cause}: {detail}")]
    RollbackFailure { cause: String, detail: String },

    #[error("Branch '{0}' already exists")]
    BranchCollision(String),

    #[error("Push failed: {0}")]
    PushFailure(String),

    #[error("Timed out after {waited_secs}s waiting for {what}")]
    PollTimeout { what: String, waited_secs: u64 },

    #[error("Oracle invocation failed: {0}")]
    Oracle(String),

    #[error("Pipeline query failed: {0}")]
    Pipeline(String),

    #[error("Evidence collection failed: {0}")]
    Evidence(String),

    #[error("Git command failed: {0}")]
    Git(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

pub type DomainResult<T> = Result<T, RemediationError>;

impl From<serde_json::Error> for RemediationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl RemediationError {
    /// True for failures of the patch application path (dry-run, apply, rollback).
    pub const fn is_apply_failure(&self) -> bool {
        matches!(
            self,
            Self::PolicyRejected(_)
                | Self::DryRunFailure(_)
                | Self::ApplyFailure(_)
                | Self::RollbackFailure { .. }
                | Self::BranchCollision(_)
                | Self::Git(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RemediationError::PollTimeout {
            what: "run 42".to_string(),
            waited_secs: 30,
        };
        assert_eq!(err.to_string(), "Timed out after 30s waiting for run 42");

        let err = RemediationError::BranchCollision("remedy/20260101-120000".to_string());
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_apply_failure_classification() {
        assert!(RemediationError::DryRunFailure("x".into()).is_apply_failure());
        assert!(RemediationError::BranchCollision("x".into()).is_apply_failure());
        assert!(!RemediationError::PushFailure("x".into()).is_apply_failure());
        assert!(!RemediationError::ContractViolation("x".into()).is_apply_failure());
    }

    #[test]
    fn test_from_serde_error() {
        let err: RemediationError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, RemediationError::Serialization(_)));
    }
}

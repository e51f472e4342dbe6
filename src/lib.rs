//! Remedy - Iterative CI Remediation Engine
//!
//! Remedy turns a single diagnostic suggestion for a failing CI pipeline into
//! a safely applied, verified fix:
//!
//! 1. collect evidence for the failed run,
//! 2. ask an external oracle for a diagnosis and validate it fail-closed,
//! 3. repair the proposed diff and push it through a safe-apply gate,
//! 4. push the fix branch and watch the run it triggers,
//! 5. repeat, bounded, until the pipeline is green or the loop gives up.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors, and port traits
//! - **Service Layer** (`services`): normalizer, gate, poller, oracle client, controller
//! - **Adapters** (`adapters`): git, GitHub Actions, HTTP oracle, evidence command, cache
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, DiagnosticMode, DiagnosticRecord, EvidenceBundle, EvidenceItem, EvidenceKind,
    IterationHistory, IterationOutcome, IterationRecord, RunHandle, RunId,
};
pub use domain::ports::{EvidenceCollector, Oracle, PipelineProvider, SourceRepository};
pub use domain::{DomainResult, RemediationError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConvergenceController, OracleClient, RunPoller, SafeApplyGate};

//! Domain models for the remediation engine.

pub mod config;
pub mod diagnostic;
pub mod evidence;
pub mod iteration;
pub mod patch;
pub mod run;

pub use config::{
    CacheConfig, Config, ConvergenceConfig, EvidenceConfig, GateConfig, LoggingConfig,
    OracleConfig, PipelineConfig, PolicyConfig, PollConfig,
};
pub use diagnostic::{DiagnosticMode, DiagnosticRecord, Hypothesis, RiskLevel, CONTRACT_VERSION};
pub use evidence::{EvidenceBundle, EvidenceItem, EvidenceKind};
pub use iteration::{HistorySummary, IterationHistory, IterationOutcome, IterationRecord};
pub use patch::PatchProposal;
pub use run::{RunConclusion, RunHandle, RunId, RunStatus};

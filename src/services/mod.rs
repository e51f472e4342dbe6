//! Service layer: the remediation engine's core components, leaf first.

pub mod convergence_controller;
pub mod diff_normalizer;
pub mod oracle_client;
pub mod run_poller;
pub mod safe_apply_gate;

pub use convergence_controller::{ControllerSettings, ConvergenceController};
pub use diff_normalizer::{normalize, normalize_with_stats, NormalizedDiff};
pub use oracle_client::{strip_code_fence, validate_record, validate_response, OracleClient};
pub use run_poller::{PollOutcome, RunPoller};
pub use safe_apply_gate::{
    branch_name_for, validate_branch_name, DryRunReport, GateOutcome, GateState, PolicyDecision,
    SafeApplyGate,
};

//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - Oracle: the external reasoning service
//! - PipelineProvider: read-only view of CI run status
//! - EvidenceCollector: produces the evidence bundle for a failed run
//! - SourceRepository: the working tree and its branches
//!
//! The services depend only on these contracts, never on a concrete adapter.

pub mod evidence_collector;
pub mod oracle;
pub mod pipeline;
pub mod source_repository;

pub use evidence_collector::EvidenceCollector;
pub use oracle::Oracle;
pub use pipeline::PipelineProvider;
pub use source_repository::SourceRepository;

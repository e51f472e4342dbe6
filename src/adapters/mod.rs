//! Adapters implementing the domain ports against real systems.
//!
//! - `git_cli`: working tree via the `git` command line
//! - `github_actions`: pipeline status via the GitHub Actions REST API
//! - `http_oracle`: oracle reached over HTTP
//! - `evidence_command`: evidence bundle produced by an external command
//! - `record_cache`: JSON hand-off files between CLI invocations

pub mod evidence_command;
pub mod git_cli;
pub mod github_actions;
pub mod http_oracle;
pub mod record_cache;

pub use evidence_command::CommandEvidenceCollector;
pub use git_cli::GitCliRepository;
pub use github_actions::GitHubActionsClient;
pub use http_oracle::HttpOracle;
pub use record_cache::RecordCache;

//! GitHub Actions pipeline adapter.
//!
//! Read-only consumer of the workflow runs REST API. Only the two queries the
//! run poller needs are implemented: latest run on a branch, and one run by id.

pub mod client;
pub mod models;

pub use client::GitHubActionsClient;

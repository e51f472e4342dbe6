//! Domain layer for the remediation engine
//!
//! This module contains the data model, the error taxonomy, and the port
//! traits external collaborators are reached through.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainResult, RemediationError};

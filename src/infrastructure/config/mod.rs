//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides
//! - Configuration validation
//! - Project files under `.remedy/`

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, CONFIG_DIR, ENV_PREFIX};

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::services::safe_apply_gate::validate_branch_name;

/// Directory holding project configuration and cache files.
pub const CONFIG_DIR: &str = ".remedy";

/// Prefix for environment overrides, e.g. `REMEDY_POLICY__UNATTENDED_MIN_CONFIDENCE=90`.
pub const ENV_PREFIX: &str = "REMEDY_";

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid confidence threshold {field} = {value}. Must be between 0 and 100")]
    InvalidThreshold { field: &'static str, value: u8 },

    #[error("Invalid max_iterations: 0. Must be at least 1")]
    ZeroMaxIterations,

    #[error("Invalid poll interval: 0. Must be at least 1 second")]
    ZeroPollInterval,

    #[error("Poll interval ({interval}s) must be shorter than {field} ({timeout}s)")]
    IntervalExceedsTimeout {
        field: &'static str,
        interval: u64,
        timeout: u64,
    },

    #[error("Invalid branch prefix '{0}'")]
    InvalidBranchPrefix(String),

    #[error("Remote name cannot be empty")]
    EmptyRemote,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.remedy/config.yaml`
    /// 3. `.remedy/local.yaml` (uncommitted overrides)
    /// 4. `REMEDY_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Config> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration rooted at `root` instead of the current directory.
    pub fn load_from(root: &Path) -> Result<Config> {
        let dir = root.join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment overrides still apply.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        for (field, value) in [
            (
                "interactive_min_confidence",
                config.policy.interactive_min_confidence,
            ),
            (
                "unattended_min_confidence",
                config.policy.unattended_min_confidence,
            ),
        ] {
            if value > 100 {
                return Err(ConfigError::InvalidThreshold { field, value });
            }
        }

        if config.convergence.max_iterations == 0 {
            return Err(ConfigError::ZeroMaxIterations);
        }

        let poll = &config.poll;
        if poll.interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        for (field, timeout) in [
            ("run_timeout_secs", poll.run_timeout_secs),
            ("new_run_timeout_secs", poll.new_run_timeout_secs),
        ] {
            if poll.interval_secs >= timeout {
                return Err(ConfigError::IntervalExceedsTimeout {
                    field,
                    interval: poll.interval_secs,
                    timeout,
                });
            }
        }

        let prefix = config.gate.branch_prefix.trim_end_matches('/');
        if prefix.is_empty() || validate_branch_name(prefix).is_err() {
            return Err(ConfigError::InvalidBranchPrefix(
                config.gate.branch_prefix.clone(),
            ));
        }
        if config.gate.remote.trim().is_empty() {
            return Err(ConfigError::EmptyRemote);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

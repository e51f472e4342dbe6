use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::domain::models::LoggingConfig;

/// Resolved logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format for stderr
    pub format: LogFormat,

    /// Directory for log files (stderr only when unset)
    pub log_dir: Option<PathBuf>,

    /// Log rotation policy
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow!("Invalid log format: {other}")),
        }
    }
}

impl FromStr for RotationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(anyhow!("Invalid log rotation: {other}")),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

impl LogConfig {
    /// Resolve the string-typed settings section.
    pub fn from_settings(settings: &LoggingConfig) -> Result<Self> {
        Ok(Self {
            level: settings.level.clone(),
            format: settings.format.parse()?,
            log_dir: settings.log_dir.as_ref().map(PathBuf::from),
            rotation: settings.rotation.parse()?,
        })
    }

    /// Override the level, e.g. from `-v` flags.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

use serde::{Deserialize, Serialize};

use super::diagnostic::DiagnosticMode;

/// Main configuration structure for remedy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Confidence thresholds for the safe-apply gate
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Convergence loop configuration
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Run polling configuration
    #[serde(default)]
    pub poll: PollConfig,

    /// Safe-apply gate configuration
    #[serde(default)]
    pub gate: GateConfig,

    /// Oracle endpoint configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Pipeline provider configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Evidence collector configuration
    #[serde(default)]
    pub evidence: EvidenceConfig,

    /// Record cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Confidence thresholds.
///
/// Interactive use and unattended loops gate the same policy with different
/// thresholds; neither is derived from the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    /// Minimum confidence for fixes applied from an interactive command
    #[serde(default = "default_interactive_min_confidence")]
    pub interactive_min_confidence: u8,

    /// Minimum confidence for fixes applied by the unattended watch loop
    #[serde(default = "default_unattended_min_confidence")]
    pub unattended_min_confidence: u8,
}

const fn default_interactive_min_confidence() -> u8 {
    60
}

const fn default_unattended_min_confidence() -> u8 {
    80
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            interactive_min_confidence: default_interactive_min_confidence(),
            unattended_min_confidence: default_unattended_min_confidence(),
        }
    }
}

/// Convergence loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvergenceConfig {
    /// Maximum number of fix iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Mode requested from the oracle on each iteration
    #[serde(default = "default_oracle_mode")]
    pub oracle_mode: DiagnosticMode,
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_oracle_mode() -> DiagnosticMode {
    DiagnosticMode::Combined
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            oracle_mode: default_oracle_mode(),
        }
    }
}

/// Run polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollConfig {
    /// Seconds between status queries
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Deadline for an already-known run to complete
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Deadline for a newly triggered run to appear and complete
    #[serde(default = "default_new_run_timeout_secs")]
    pub new_run_timeout_secs: u64,
}

const fn default_interval_secs() -> u64 {
    15
}

const fn default_run_timeout_secs() -> u64 {
    1800
}

const fn default_new_run_timeout_secs() -> u64 {
    1800
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            new_run_timeout_secs: default_new_run_timeout_secs(),
        }
    }
}

/// Safe-apply gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GateConfig {
    /// Prefix for fix branches (`<prefix>/<YYYYMMDD-HHMMSS>`)
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,

    /// Prefix for fix commit messages
    #[serde(default = "default_commit_prefix")]
    pub commit_prefix: String,

    /// Branches the gate must never write to
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,

    /// Remote fix branches are pushed to
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_branch_prefix() -> String {
    "remedy".to_string()
}

fn default_commit_prefix() -> String {
    "fix(remedy):".to_string()
}

fn default_protected_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_remote() -> String {
    "origin".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            branch_prefix: default_branch_prefix(),
            commit_prefix: default_commit_prefix(),
            protected_branches: default_protected_branches(),
            remote: default_remote(),
        }
    }
}

/// Oracle endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// URL the evidence bundle is POSTed to
    #[serde(default = "default_oracle_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the bearer token (optional)
    #[serde(default = "default_oracle_token_env")]
    pub token_env: String,

    /// Request timeout in seconds
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_oracle_endpoint() -> String {
    "http://127.0.0.1:8787/v1/diagnose".to_string()
}

fn default_oracle_token_env() -> String {
    "REMEDY_ORACLE_TOKEN".to_string()
}

const fn default_oracle_timeout() -> u64 {
    120
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: default_oracle_endpoint(),
            token_env: default_oracle_token_env(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

/// Pipeline provider configuration (GitHub Actions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// REST API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Repository owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Repository name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Workflow file name or id to restrict runs to (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,

    /// Environment variable holding the API token
    #[serde(default = "default_pipeline_token_env")]
    pub token_env: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_pipeline_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: None,
            repo: None,
            workflow: None,
            token_env: default_pipeline_token_env(),
        }
    }
}

/// Evidence collector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EvidenceConfig {
    /// Command that prints an evidence bundle on stdout.
    /// `{run_id}` and `{branch}` are substituted in every argument.
    #[serde(default)]
    pub command: Vec<String>,
}

/// Record cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Persist the latest record and history for other commands
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Directory cache files are written to
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

const fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> String {
    ".remedy".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

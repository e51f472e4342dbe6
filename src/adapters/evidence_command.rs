//! `EvidenceCollector` that delegates to an external command.
//!
//! The command prints an evidence bundle as JSON on stdout. `{run_id}` and
//! `{branch}` are substituted in every argument before it runs. Redaction of
//! secrets is the command's responsibility.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::{DomainResult, RemediationError};
use crate::domain::models::{EvidenceBundle, EvidenceConfig, RunHandle};
use crate::domain::ports::EvidenceCollector;

#[derive(Debug, Clone)]
pub struct CommandEvidenceCollector {
    argv: Vec<String>,
    workdir: Option<PathBuf>,
}

impl CommandEvidenceCollector {
    pub fn new(argv: Vec<String>) -> DomainResult<Self> {
        if argv.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(RemediationError::Configuration(
                "evidence.command must name a program".to_string(),
            ));
        }
        Ok(Self {
            argv,
            workdir: None,
        })
    }

    pub fn from_config(config: &EvidenceConfig) -> DomainResult<Self> {
        Self::new(config.command.clone())
    }

    #[must_use]
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    fn expand(&self, run: &RunHandle, branch: &str) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{run_id}", run.id.as_str())
                    .replace("{branch}", branch)
            })
            .collect()
    }
}

#[async_trait]
impl EvidenceCollector for CommandEvidenceCollector {
    async fn collect(&self, run: &RunHandle, branch: &str) -> DomainResult<EvidenceBundle> {
        let argv = self.expand(run, branch);
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| RemediationError::Configuration("empty evidence command".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        debug!(program = %program, run = %run.id, "Collecting evidence");
        let output = command
            .output()
            .await
            .map_err(|e| RemediationError::Evidence(format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(program = %program, status = %output.status, "Evidence command failed");
            return Err(RemediationError::Evidence(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let bundle: EvidenceBundle = serde_json::from_slice(&output.stdout)
            .map_err(|e| RemediationError::Evidence(format!("invalid evidence bundle: {e}")))?;
        debug!(items = bundle.len(), "Evidence collected");
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{RunConclusion, RunStatus};

    fn failed_run() -> RunHandle {
        RunHandle::new(4242u64, RunStatus::Completed, RunConclusion::Failure)
    }

    #[test]
    fn test_rejects_empty_command() {
        assert!(CommandEvidenceCollector::new(vec![]).is_err());
        assert!(CommandEvidenceCollector::new(vec![" ".to_string()]).is_err());
    }

    #[test]
    fn test_placeholder_expansion() {
        let collector = CommandEvidenceCollector::new(vec![
            "collect".to_string(),
            "--run={run_id}".to_string(),
            "{branch}".to_string(),
        ])
        .unwrap();
        assert_eq!(
            collector.expand(&failed_run(), "main"),
            vec!["collect", "--run=4242", "main"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collects_bundle_from_stdout() {
        let script = r#"printf '{"evidence":[{"id":"E1","type":"run_log","data":"run %s"}]}' "$1""#;
        let collector = CommandEvidenceCollector::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "sh".to_string(),
            "{run_id}".to_string(),
        ])
        .unwrap();

        let bundle = collector.collect(&failed_run(), "main").await.unwrap();
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.get("E1").unwrap().data, "run 4242");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_evidence_error() {
        let collector = CommandEvidenceCollector::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo boom >&2; exit 3".to_string(),
        ])
        .unwrap();
        let err = collector.collect(&failed_run(), "main").await.unwrap_err();
        assert!(matches!(err, RemediationError::Evidence(ref m) if m.contains("boom")));
    }
}

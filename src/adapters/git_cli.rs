//! `SourceRepository` backed by the `git` command line.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

use crate::domain::errors::{DomainResult, RemediationError};
use crate::domain::ports::SourceRepository;
use crate::services::safe_apply_gate::validate_branch_name;

/// Runs `git` in a working directory.
///
/// Paths listed as excluded (the local cache directory, typically) are
/// invisible to the cleanliness check, to staging, and to cleanup.
#[derive(Debug, Clone)]
pub struct GitCliRepository {
    workdir: PathBuf,
    excluded: Vec<String>,
}

impl GitCliRepository {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            excluded: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_excluded(mut self, path: impl Into<String>) -> Self {
        self.excluded.push(path.into());
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn pathspec(&self) -> Vec<String> {
        let mut spec = vec!["--".to_string(), ".".to_string()];
        spec.extend(self.excluded.iter().map(|p| format!(":(exclude){p}")));
        spec
    }

    async fn git(&self, args: &[&str], stdin: Option<&str>) -> DomainResult<String> {
        debug!(args = ?args, "Running git");
        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RemediationError::Git(format!("failed to run git: {e}")))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // Dropping the handle closes stdin so git sees EOF.
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let subcommand = args.first().copied().unwrap_or_default();
            error!(subcommand, stderr = %stderr.trim(), "git failed");
            return Err(RemediationError::Git(format!(
                "git {subcommand} failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn git_with_pathspec(&self, args: &[&str]) -> DomainResult<String> {
        let spec = self.pathspec();
        let mut full: Vec<&str> = args.to_vec();
        full.extend(spec.iter().map(String::as_str));
        self.git(&full, None).await
    }
}

#[async_trait]
impl SourceRepository for GitCliRepository {
    async fn current_branch(&self) -> DomainResult<String> {
        let output = Command::new("git")
            .args(["symbolic-ref", "--quiet", "--short", "HEAD"])
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .await?;
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).trim().to_string()),
            // `--quiet` exits 1 silently when HEAD is not a symbolic ref.
            Some(1) => Err(RemediationError::Git(
                "HEAD is detached; check out a branch before applying a fix".to_string(),
            )),
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!(stderr = %stderr.trim(), "git symbolic-ref failed");
                Err(RemediationError::Git(format!(
                    "git symbolic-ref failed: {}",
                    stderr.trim()
                )))
            }
        }
    }

    async fn is_clean(&self) -> DomainResult<bool> {
        let out = self.git_with_pathspec(&["status", "--porcelain"]).await?;
        Ok(out.trim().is_empty())
    }

    async fn branch_exists(&self, name: &str) -> DomainResult<bool> {
        let status = Command::new("git")
            .args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{name}")])
            .current_dir(&self.workdir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.success())
    }

    async fn check_patch(&self, patch: &str) -> DomainResult<()> {
        self.git(&["apply", "--check", "-"], Some(patch)).await?;
        Ok(())
    }

    async fn create_branch(&self, name: &str) -> DomainResult<()> {
        validate_branch_name(name)?;
        self.git(&["switch", "-c", name], None).await?;
        Ok(())
    }

    async fn apply_patch(&self, patch: &str) -> DomainResult<()> {
        self.git(&["apply", "--whitespace=nowarn", "-"], Some(patch))
            .await?;
        Ok(())
    }

    async fn stage_all(&self) -> DomainResult<()> {
        self.git_with_pathspec(&["add", "-A"]).await?;
        Ok(())
    }

    async fn commit(&self, message: &str) -> DomainResult<String> {
        self.git(&["commit", "--quiet", "-m", message], None).await?;
        let sha = self.git(&["rev-parse", "HEAD"], None).await?;
        Ok(sha.trim().to_string())
    }

    async fn discard_changes(&self) -> DomainResult<()> {
        self.git(&["reset", "--hard", "--quiet"], None).await?;
        let mut args = vec!["clean", "-fd", "--quiet"];
        for path in &self.excluded {
            args.extend(["-e", path.as_str()]);
        }
        self.git(&args, None).await?;
        Ok(())
    }

    async fn switch_branch(&self, name: &str) -> DomainResult<()> {
        validate_branch_name(name)?;
        self.git(&["switch", "--quiet", name], None).await?;
        Ok(())
    }

    async fn delete_branch(&self, name: &str) -> DomainResult<()> {
        validate_branch_name(name)?;
        self.git(&["branch", "-D", name], None).await?;
        Ok(())
    }

    async fn push_branch(&self, remote: &str, branch: &str) -> DomainResult<()> {
        validate_branch_name(branch)?;
        self.git(&["push", "--quiet", "-u", remote, branch], None)
            .await
            .map_err(|e| RemediationError::PushFailure(e.to_string()))?;
        Ok(())
    }
}

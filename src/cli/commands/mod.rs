//! CLI command implementations.

pub mod diagnose;
pub mod fix;
pub mod history;
pub mod normalize;
pub mod validate;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use crate::adapters::git_cli::GitCliRepository;
use crate::domain::models::Config;

/// Read a file, or stdin when no path is given.
pub(crate) async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Repository in the current directory with the cache directory hidden from git operations.
pub(crate) fn git_repository(config: &Config) -> GitCliRepository {
    GitCliRepository::new(".").with_excluded(config.cache.dir.clone())
}

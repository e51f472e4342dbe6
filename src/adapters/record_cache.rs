//! On-disk cache of the latest validated record and iteration history.
//!
//! Lets one command hand its result to the next (`diagnose` then `fix`,
//! `watch` then `history`). The controller never reads it back; history held
//! in memory is authoritative for a running loop.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CacheConfig, DiagnosticRecord, IterationHistory};

const RECORD_FILE: &str = "latest_record.json";
const HISTORY_FILE: &str = "history.json";

/// JSON files under one directory, each replaced atomically.
#[derive(Debug, Clone)]
pub struct RecordCache {
    dir: PathBuf,
}

impl RecordCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(&config.dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(RECORD_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    pub async fn save_record(&self, record: &DiagnosticRecord) -> DomainResult<()> {
        self.write_json(&self.record_path(), record).await
    }

    pub async fn load_record(&self) -> DomainResult<Option<DiagnosticRecord>> {
        self.read_json(&self.record_path()).await
    }

    pub async fn save_history(&self, history: &IterationHistory) -> DomainResult<()> {
        self.write_json(&self.history_path(), history).await
    }

    pub async fn load_history(&self) -> DomainResult<Option<IterationHistory>> {
        self.read_json(&self.history_path()).await
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> DomainResult<()> {
        fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(value)?;

        // Readers see either the old file or the new one, never a torn write.
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(path = %path.display(), "Cache file written");
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> DomainResult<Option<T>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

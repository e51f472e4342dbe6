//! Evidence bundle models.
//!
//! An evidence bundle is the immutable, identifier-tagged input package that
//! describes one observed pipeline failure. Consumers reference items by id,
//! never by array position.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainResult, RemediationError};

/// Category of an evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Repository metadata (default branch, remotes, recent commits).
    Repository,
    /// Log output of the failed run.
    RunLog,
    /// Workflow definition the run executed.
    Workflow,
    /// Run metadata (trigger, timing, job list).
    RunMetadata,
    /// A diff relevant to the failure.
    Diff,
    /// Anything else the collector chose to include.
    #[serde(other)]
    Other,
}

/// One identified piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Short stable token, unique within one bundle (e.g. `E1`).
    pub id: String,

    /// What this item describes.
    #[serde(rename = "type")]
    pub kind: EvidenceKind,

    /// Opaque payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl EvidenceItem {
    pub fn new(id: impl Into<String>, kind: EvidenceKind, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind,
            data,
        }
    }
}

/// Ordered, immutable set of evidence items.
///
/// Fields are private so a bundle can only be obtained through [`EvidenceBundle::new`]
/// or deserialization, both of which enforce id uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceBundle {
    timestamp: DateTime<Utc>,
    evidence: Vec<EvidenceItem>,
}

#[derive(Deserialize)]
struct RawBundle {
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
    evidence: Vec<EvidenceItem>,
}

impl<'de> Deserialize<'de> for EvidenceBundle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawBundle::deserialize(deserializer)?;
        Self::with_timestamp(raw.timestamp, raw.evidence).map_err(serde::de::Error::custom)
    }
}

impl EvidenceBundle {
    /// Build a bundle stamped with the current time.
    pub fn new(items: Vec<EvidenceItem>) -> DomainResult<Self> {
        Self::with_timestamp(Utc::now(), items)
    }

    /// Build a bundle with an explicit timestamp.
    pub fn with_timestamp(timestamp: DateTime<Utc>, items: Vec<EvidenceItem>) -> DomainResult<Self> {
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if item.id.trim().is_empty() {
                return Err(RemediationError::Evidence(
                    "evidence item id cannot be empty".to_string(),
                ));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(RemediationError::Evidence(format!(
                    "duplicate evidence id '{}'",
                    item.id
                )));
            }
        }
        Ok(Self {
            timestamp,
            evidence: items,
        })
    }

    /// Load a bundle from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> DomainResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    pub fn len(&self) -> usize {
        self.evidence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }

    /// Whether an item with this id exists in the bundle.
    pub fn contains(&self, id: &str) -> bool {
        self.evidence.iter().any(|item| item.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&EvidenceItem> {
        self.evidence.iter().find(|item| item.id == id)
    }

    /// Ids in bundle order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.evidence.iter().map(|item| item.id.as_str())
    }
}

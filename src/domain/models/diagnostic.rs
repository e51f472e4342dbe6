//! Diagnostic record models.
//!
//! A [`DiagnosticRecord`] is constructed by the oracle client after the raw
//! response has passed contract validation. Records deserialized from disk are
//! re-checked with `oracle_client::validate_record` before they reach the
//! gate; everything downstream can treat a record as trusted, typed data.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Version tag every oracle response must carry.
pub const CONTRACT_VERSION: &str = "remedy.diagnostic/v1";

/// What the oracle was asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticMode {
    /// Ranked hypotheses for the failure.
    Hypotheses,
    /// A summary and explanation of the failure.
    Explain,
    /// A unified-diff patch that fixes the failure.
    Patch,
    /// All of the above.
    Combined,
}

impl DiagnosticMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hypotheses => "hypotheses",
            Self::Explain => "explain",
            Self::Patch => "patch",
            Self::Combined => "combined",
        }
    }

    pub const fn bears_hypotheses(&self) -> bool {
        matches!(self, Self::Hypotheses | Self::Combined)
    }

    pub const fn bears_explanation(&self) -> bool {
        matches!(self, Self::Explain | Self::Combined)
    }

    pub const fn bears_patch(&self) -> bool {
        matches!(self, Self::Patch | Self::Combined)
    }
}

impl fmt::Display for DiagnosticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hypotheses" => Ok(Self::Hypotheses),
            "explain" => Ok(Self::Explain),
            "patch" => Ok(Self::Patch),
            "combined" => Ok(Self::Combined),
            other => Err(format!(
                "unknown mode '{other}' (expected hypotheses, explain, patch or combined)"
            )),
        }
    }
}

/// Oracle-assigned danger estimate for a proposed patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked explanation of the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub rank: u32,
    pub title: String,
    /// Integer confidence in `[0, 100]`.
    pub confidence: u8,
    #[serde(default)]
    pub explanation: String,
    /// Ids of evidence items that support this hypothesis.
    pub evidence_refs: BTreeSet<String>,
}

/// Validated oracle response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub version: String,
    pub mode: DiagnosticMode,
    #[serde(default)]
    pub hypotheses: Vec<Hypothesis>,
    /// Record-level confidence carried by explain and patch responses.
    #[serde(default)]
    pub confidence: Option<u8>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    /// Unified diff text, as produced by the oracle (not yet normalized).
    #[serde(default)]
    pub patch: Option<String>,
    /// Short description of the patch; used in the commit message.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl DiagnosticRecord {
    /// Confidence used for policy decisions.
    ///
    /// The record-level confidence when present, otherwise the confidence of
    /// the best-ranked hypothesis.
    pub fn effective_confidence(&self) -> Option<u8> {
        self.confidence.or_else(|| {
            self.hypotheses
                .iter()
                .min_by_key(|h| h.rank)
                .map(|h| h.confidence)
        })
    }

    pub const fn is_high_risk(&self) -> bool {
        matches!(self.risk_level, Some(RiskLevel::High))
    }

    /// Best-ranked hypothesis, if any.
    pub fn top_hypothesis(&self) -> Option<&Hypothesis> {
        self.hypotheses.iter().min_by_key(|h| h.rank)
    }

    /// A one-line description suitable for a commit message.
    pub fn headline(&self) -> &str {
        self.description
            .as_deref()
            .or(self.summary.as_deref())
            .or_else(|| self.top_hypothesis().map(|h| h.title.as_str()))
            .unwrap_or("automated fix")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hypothesis(rank: u32, confidence: u8) -> Hypothesis {
        Hypothesis {
            rank,
            title: format!("hypothesis {rank}"),
            confidence,
            explanation: String::new(),
            evidence_refs: BTreeSet::new(),
        }
    }

    fn record() -> DiagnosticRecord {
        DiagnosticRecord {
            version: CONTRACT_VERSION.to_string(),
            mode: DiagnosticMode::Hypotheses,
            hypotheses: vec![hypothesis(2, 40), hypothesis(1, 70)],
            confidence: None,
            summary: None,
            explanation: None,
            patch: None,
            description: None,
            risk_level: None,
            warnings: vec![],
        }
    }

    #[test]
    fn test_effective_confidence_falls_back_to_top_hypothesis() {
        let mut rec = record();
        assert_eq!(rec.effective_confidence(), Some(70));

        rec.confidence = Some(91);
        assert_eq!(rec.effective_confidence(), Some(91));
    }

    #[test]
    fn test_headline_preference() {
        let mut rec = record();
        assert_eq!(rec.headline(), "hypothesis 1");
        rec.summary = Some("Linker flags missing".to_string());
        assert_eq!(rec.headline(), "Linker flags missing");
        rec.description = Some("Add -lssl to build flags".to_string());
        assert_eq!(rec.headline(), "Add -lssl to build flags");
    }

    #[test]
    fn test_mode_parsing_and_traits() {
        assert_eq!("combined".parse::<DiagnosticMode>(), Ok(DiagnosticMode::Combined));
        assert!("fix".parse::<DiagnosticMode>().is_err());
        assert!(DiagnosticMode::Combined.bears_patch());
        assert!(DiagnosticMode::Combined.bears_hypotheses());
        assert!(!DiagnosticMode::Explain.bears_patch());
    }

    #[test]
    fn test_risk_level_wire_format() {
        let json = serde_json::to_string(&RiskLevel::High).unwrap();
        assert_eq!(json, "\"HIGH\"");
        assert_eq!("MEDIUM".parse::<RiskLevel>(), Ok(RiskLevel::Medium));
        assert!("low".parse::<RiskLevel>().is_err());
    }
}

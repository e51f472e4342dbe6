//! Oracle Client Contract.
//!
//! Wraps any [`Oracle`] with a fail-closed validator. The raw response must be
//! a JSON object (optionally inside a Markdown code fence) that satisfies the
//! rule set of the requested mode; `combined` must satisfy all of them. Any
//! violation rejects the whole response.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainResult, RemediationError};
use crate::domain::models::{
    DiagnosticMode, DiagnosticRecord, EvidenceBundle, Hypothesis, RiskLevel, CONTRACT_VERSION,
};
use crate::domain::ports::Oracle;

/// Oracle plus contract validation.
pub struct OracleClient<O: Oracle + ?Sized> {
    oracle: Arc<O>,
}

impl<O: Oracle + ?Sized> OracleClient<O> {
    pub fn new(oracle: Arc<O>) -> Self {
        Self { oracle }
    }

    /// Request a diagnosis and validate it against `bundle`.
    #[instrument(skip(self, bundle), fields(evidence = bundle.len()))]
    pub async fn diagnose(
        &self,
        bundle: &EvidenceBundle,
        mode: DiagnosticMode,
    ) -> DomainResult<DiagnosticRecord> {
        let raw = self.oracle.request(bundle, mode).await?;
        debug!(response_length = raw.len(), "Oracle responded");

        let record = validate_response(&raw, bundle, mode).inspect_err(|e| {
            warn!(error = %e, "Oracle response rejected");
        })?;
        info!(
            confidence = ?record.effective_confidence(),
            risk = ?record.risk_level,
            hypotheses = record.hypotheses.len(),
            "Diagnosis accepted"
        );
        Ok(record)
    }
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```")) || trimmed.len() < 6 {
        return trimmed;
    }
    // Skip the opening fence and its info string (```json).
    let start = trimmed.find('\n').map_or(3, |pos| pos + 1);
    let end = trimmed.rfind("\n```").unwrap_or(trimmed.len() - 3);
    if start > end {
        return "";
    }
    trimmed[start..end].trim()
}

/// Validate a raw oracle response. Fail-closed.
pub fn validate_response(
    raw: &str,
    bundle: &EvidenceBundle,
    mode: DiagnosticMode,
) -> DomainResult<DiagnosticRecord> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| violation(format!("response is not valid JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| violation("response is not a JSON object"))?;

    match obj.get("version").and_then(Value::as_str) {
        Some(CONTRACT_VERSION) => {}
        Some(other) => {
            return Err(violation(format!(
                "version '{other}' does not match '{CONTRACT_VERSION}'"
            )))
        }
        None => return Err(violation("missing version")),
    }

    let declared: DiagnosticMode = obj
        .get("mode")
        .and_then(Value::as_str)
        .ok_or_else(|| violation("missing mode"))?
        .parse()
        .map_err(violation)?;
    if declared != mode {
        return Err(violation(format!(
            "mode '{declared}' does not match requested '{mode}'"
        )));
    }

    let hypotheses = match obj.get("hypotheses") {
        None | Some(Value::Null) if !mode.bears_hypotheses() => Vec::new(),
        None | Some(Value::Null) => return Err(violation("missing hypotheses")),
        Some(value) => parse_hypotheses(value, bundle, mode.bears_hypotheses())?,
    };

    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) if mode.bears_explanation() || mode.bears_patch() => {
            return Err(violation("missing confidence"))
        }
        None | Some(Value::Null) => None,
        Some(value) => Some(confidence_value(value, "confidence")?),
    };

    let summary = optional_text(obj, "summary", mode.bears_explanation())?;
    let explanation = optional_text(obj, "explanation", mode.bears_explanation())?;
    let patch = optional_text(obj, "patch", mode.bears_patch())?;
    let description = optional_text(obj, "description", mode.bears_patch())?;

    let risk_level = match obj.get("risk_level") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.parse::<RiskLevel>().map_err(violation)?),
        Some(_) => return Err(violation("risk_level must be a string")),
    };

    let warnings = match obj.get("warnings") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|w| {
                w.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| violation("warnings must be strings"))
            })
            .collect::<DomainResult<_>>()?,
        Some(_) => return Err(violation("warnings must be an array")),
    };

    Ok(DiagnosticRecord {
        version: CONTRACT_VERSION.to_string(),
        mode,
        hypotheses,
        confidence,
        summary,
        explanation,
        patch,
        description,
        risk_level,
        warnings,
    })
}

/// Re-check a typed record against the contract rules that do not need the
/// evidence bundle.
///
/// For records that arrive from disk (a cache file or `fix --record`) rather
/// than through [`validate_response`]. Evidence references cannot be resolved
/// here and are not checked.
pub fn validate_record(record: &DiagnosticRecord) -> DomainResult<()> {
    if record.version != CONTRACT_VERSION {
        return Err(violation(format!(
            "version '{}' does not match '{CONTRACT_VERSION}'",
            record.version
        )));
    }
    let mode = record.mode;

    if mode.bears_hypotheses() && record.hypotheses.is_empty() {
        return Err(violation("hypotheses must not be empty"));
    }
    for (index, hypothesis) in record.hypotheses.iter().enumerate() {
        check_range(hypothesis.confidence, &format!("hypotheses[{index}].confidence"))?;
        if hypothesis.title.trim().is_empty() {
            return Err(violation(format!(
                "hypotheses[{index}].title must be a non-empty string"
            )));
        }
    }

    match record.confidence {
        Some(c) => check_range(c, "confidence")?,
        None if mode.bears_explanation() || mode.bears_patch() => {
            return Err(violation("missing confidence"))
        }
        None => {}
    }

    let required = [
        ("summary", &record.summary, mode.bears_explanation()),
        ("explanation", &record.explanation, mode.bears_explanation()),
        ("patch", &record.patch, mode.bears_patch()),
        ("description", &record.description, mode.bears_patch()),
    ];
    for (field, value, needed) in required {
        if needed && !value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            return Err(violation(format!("{field} must be a non-empty string")));
        }
    }
    Ok(())
}

fn check_range(confidence: u8, field: &str) -> DomainResult<()> {
    if confidence > 100 {
        return Err(violation(format!("{field} {confidence} is outside 0..=100")));
    }
    Ok(())
}

fn violation(detail: impl Into<String>) -> RemediationError {
    RemediationError::ContractViolation(detail.into())
}

/// Integer in `[0, 100]`; floats, strings, and out-of-range values are rejected.
fn confidence_value(value: &Value, field: &str) -> DomainResult<u8> {
    let n = value
        .as_i64()
        .ok_or_else(|| violation(format!("{field} must be an integer")))?;
    u8::try_from(n)
        .ok()
        .filter(|c| *c <= 100)
        .ok_or_else(|| violation(format!("{field} {n} is outside 0..=100")))
}

fn optional_text(obj: &Map<String, Value>, field: &str, required: bool) -> DomainResult<Option<String>> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
        Some(Value::String(_)) | None | Some(Value::Null) if required => {
            Err(violation(format!("{field} must be a non-empty string")))
        }
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(_)) => Ok(None),
        Some(_) => Err(violation(format!("{field} must be a string"))),
    }
}

fn parse_hypotheses(
    value: &Value,
    bundle: &EvidenceBundle,
    required: bool,
) -> DomainResult<Vec<Hypothesis>> {
    let entries = value
        .as_array()
        .ok_or_else(|| violation("hypotheses must be an array"))?;
    if required && entries.is_empty() {
        return Err(violation("hypotheses must not be empty"));
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| parse_hypothesis(i, entry, bundle))
        .collect()
}

fn parse_hypothesis(index: usize, entry: &Value, bundle: &EvidenceBundle) -> DomainResult<Hypothesis> {
    let at = |field: &str| format!("hypotheses[{index}].{field}");
    let obj = entry
        .as_object()
        .ok_or_else(|| violation(format!("hypotheses[{index}] must be an object")))?;

    let confidence = confidence_value(
        obj.get("confidence")
            .ok_or_else(|| violation(format!("{} is missing", at("confidence"))))?,
        &at("confidence"),
    )?;

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| violation(format!("{} must be a non-empty string", at("title"))))?
        .to_string();

    let refs = obj
        .get("evidence_refs")
        .and_then(Value::as_array)
        .ok_or_else(|| violation(format!("{} must be present as an array", at("evidence_refs"))))?;
    let mut evidence_refs = BTreeSet::new();
    for r in refs {
        let id = r
            .as_str()
            .ok_or_else(|| violation(format!("{} must contain strings", at("evidence_refs"))))?;
        if !bundle.contains(id) {
            return Err(violation(format!(
                "{} references unknown evidence '{id}'",
                at("evidence_refs")
            )));
        }
        evidence_refs.insert(id.to_string());
    }

    let rank = match obj.get("rank") {
        None | Some(Value::Null) => u32::try_from(index + 1).unwrap_or(u32::MAX),
        Some(v) => v
            .as_u64()
            .and_then(|r| u32::try_from(r).ok())
            .ok_or_else(|| violation(format!("{} must be a non-negative integer", at("rank"))))?,
    };

    let explanation = obj
        .get("explanation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Hypothesis {
        rank,
        title,
        confidence,
        explanation,
        evidence_refs,
    })
}

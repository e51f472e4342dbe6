//! Oracle client contract, exercised through `OracleClient::diagnose`.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{combined_response, evidence_bundle, FakeOracle, MISCOUNTED_PATCH};
use remedy::domain::errors::RemediationError;
use remedy::domain::models::{DiagnosticMode, RiskLevel, CONTRACT_VERSION};
use remedy::services::OracleClient;

async fn diagnose(raw: String, mode: DiagnosticMode) -> Result<remedy::DiagnosticRecord, RemediationError> {
    OracleClient::new(Arc::new(FakeOracle::answering(raw)))
        .diagnose(&evidence_bundle(), mode)
        .await
}

#[tokio::test]
async fn test_fenced_combined_response_is_accepted() {
    let body = serde_json::to_string_pretty(&combined_response(88, "MEDIUM", MISCOUNTED_PATCH)).unwrap();
    let raw = format!("Here is my diagnosis:\n```json\n{body}\n```");

    // Prose around the fence is not part of the contract.
    assert!(diagnose(raw, DiagnosticMode::Combined).await.is_err());

    let raw = format!("```json\n{body}\n```\n");
    let record = diagnose(raw, DiagnosticMode::Combined).await.unwrap();
    assert_eq!(record.effective_confidence(), Some(88));
    assert_eq!(record.risk_level, Some(RiskLevel::Medium));
    assert_eq!(record.patch.as_deref(), Some(MISCOUNTED_PATCH));
    assert_eq!(record.headline(), "Update a.txt");
}

#[tokio::test]
async fn test_hypotheses_mode_needs_no_confidence() {
    let raw = json!({
        "version": CONTRACT_VERSION,
        "mode": "hypotheses",
        "hypotheses": [
            {"rank": 2, "title": "Flaky network", "confidence": 20, "evidence_refs": []},
            {"rank": 1, "title": "Stale fixture", "confidence": 70, "evidence_refs": ["E1"]}
        ]
    });

    let record = diagnose(raw.to_string(), DiagnosticMode::Hypotheses).await.unwrap();
    assert_eq!(record.confidence, None);
    assert_eq!(record.top_hypothesis().map(|h| h.title.as_str()), Some("Stale fixture"));
    assert_eq!(record.effective_confidence(), Some(70));
}

#[tokio::test]
async fn test_patch_mode_requires_patch_and_description() {
    let mut raw = json!({
        "version": CONTRACT_VERSION,
        "mode": "patch",
        "confidence": 90,
        "patch": MISCOUNTED_PATCH
    });
    assert!(matches!(
        diagnose(raw.to_string(), DiagnosticMode::Patch).await,
        Err(RemediationError::ContractViolation(_))
    ));

    raw["description"] = json!("Update a.txt");
    let record = diagnose(raw.to_string(), DiagnosticMode::Patch).await.unwrap();
    assert!(record.hypotheses.is_empty());
    assert_eq!(record.confidence, Some(90));
}

#[tokio::test]
async fn test_response_for_other_mode_is_rejected() {
    let raw = combined_response(90, "LOW", MISCOUNTED_PATCH).to_string();
    let err = diagnose(raw, DiagnosticMode::Patch).await.unwrap_err();
    assert!(matches!(err, RemediationError::ContractViolation(ref m) if m.contains("mode")));
}

#[tokio::test]
async fn test_one_bad_hypothesis_rejects_everything() {
    let mut raw = combined_response(90, "LOW", MISCOUNTED_PATCH);
    raw["hypotheses"]
        .as_array_mut()
        .unwrap()
        .push(json!({"rank": 2, "title": "Guess", "confidence": 10, "evidence_refs": ["E7"]}));

    let err = diagnose(raw.to_string(), DiagnosticMode::Combined).await.unwrap_err();
    assert!(matches!(err, RemediationError::ContractViolation(ref m) if m.contains("E7")));
}

#[tokio::test]
async fn test_oracle_transport_error_passes_through() {
    let client = OracleClient::new(Arc::new(FakeOracle::failing("timed out")));
    let err = client
        .diagnose(&evidence_bundle(), DiagnosticMode::Combined)
        .await
        .unwrap_err();
    assert!(matches!(err, RemediationError::Oracle(_)));
}

#[tokio::test]
async fn test_warnings_are_kept() {
    let mut raw = combined_response(90, "LOW", MISCOUNTED_PATCH);
    raw["warnings"] = json!(["log was truncated"]);
    let record = diagnose(raw.to_string(), DiagnosticMode::Combined).await.unwrap();
    assert_eq!(record.warnings, vec!["log was truncated"]);

    raw["warnings"] = json!([1, 2]);
    assert!(diagnose(raw.to_string(), DiagnosticMode::Combined).await.is_err());
}

//! `Oracle` reached over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::domain::errors::{DomainResult, RemediationError};
use crate::domain::models::{DiagnosticMode, EvidenceBundle, OracleConfig};
use crate::domain::ports::Oracle;

/// Request body POSTed to the oracle endpoint.
#[derive(Debug, Serialize)]
struct DiagnoseRequest<'a> {
    mode: DiagnosticMode,
    bundle: &'a EvidenceBundle,
}

/// POSTs `{mode, bundle}` and returns the body text unvalidated.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpOracle {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemediationError::Oracle(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: None,
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn from_config(config: &OracleConfig) -> DomainResult<Self> {
        let oracle = Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))?;
        Ok(match std::env::var(&config.token_env) {
            Ok(token) if !token.is_empty() => oracle.with_token(token),
            _ => oracle,
        })
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn request(&self, bundle: &EvidenceBundle, mode: DiagnosticMode) -> DomainResult<String> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .header("User-Agent", "remedy")
            .json(&DiagnoseRequest { mode, bundle });
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| RemediationError::Oracle(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RemediationError::Oracle(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(RemediationError::Oracle(format!("endpoint returned {status}: {body}")));
        }

        debug!(%status, length = body.len(), "Oracle response received");
        Ok(body)
    }
}

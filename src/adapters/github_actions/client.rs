//! GitHub Actions REST client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::domain::errors::{DomainResult, RemediationError};
use crate::domain::models::{PipelineConfig, RunHandle, RunId};
use crate::domain::ports::PipelineProvider;

use super::models::{WorkflowRun, WorkflowRunsResponse};

/// HTTP client for the workflow runs endpoints.
///
/// All failures map to [`RemediationError::Pipeline`]; the poller does not
/// retry them.
#[derive(Debug, Clone)]
pub struct GitHubActionsClient {
    http: Client,
    api_base: String,
    owner: String,
    repo: String,
    workflow: Option<String>,
    token: Option<String>,
}

impl GitHubActionsClient {
    pub fn new(api_base: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            workflow: None,
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    /// Build from configuration, reading the token from `token_env` if set.
    pub fn from_config(config: &PipelineConfig) -> DomainResult<Self> {
        let (Some(owner), Some(repo)) = (config.owner.as_deref(), config.repo.as_deref()) else {
            return Err(RemediationError::Configuration(
                "pipeline.owner and pipeline.repo must be set".to_string(),
            ));
        };
        let mut client = Self::new(&config.api_base, owner, repo);
        if let Some(workflow) = &config.workflow {
            client = client.with_workflow(workflow);
        }
        if let Ok(token) = std::env::var(&config.token_env) {
            if !token.is_empty() {
                client = client.with_token(token);
            }
        }
        Ok(client)
    }

    fn runs_url(&self) -> String {
        match &self.workflow {
            Some(workflow) => format!(
                "{}/repos/{}/{}/actions/workflows/{}/runs",
                self.api_base, self.owner, self.repo, workflow
            ),
            None => format!(
                "{}/repos/{}/{}/actions/runs",
                self.api_base, self.owner, self.repo
            ),
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "remedy");
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }
}

#[async_trait]
impl PipelineProvider for GitHubActionsClient {
    async fn latest_run(&self, branch: &str) -> DomainResult<Option<RunHandle>> {
        let resp = self
            .request(&self.runs_url())
            .query(&[("branch", branch), ("per_page", "1")])
            .send()
            .await
            .map_err(|e| RemediationError::Pipeline(format!("GitHub list runs request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemediationError::Pipeline(format!(
                "GitHub list runs returned {status}: {body}"
            )));
        }

        let runs = resp.json::<WorkflowRunsResponse>().await.map_err(|e| {
            RemediationError::Pipeline(format!("GitHub list runs parse failed: {e}"))
        })?;
        debug!(branch, total = runs.total_count, "Listed workflow runs");
        Ok(runs.workflow_runs.first().map(WorkflowRun::to_handle))
    }

    async fn run(&self, id: &RunId) -> DomainResult<Option<RunHandle>> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{}",
            self.api_base, self.owner, self.repo, id
        );
        let resp = self
            .request(&url)
            .send()
            .await
            .map_err(|e| RemediationError::Pipeline(format!("GitHub get run request failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RemediationError::Pipeline(format!(
                "GitHub get run returned {status}: {body}"
            )));
        }

        let run = resp.json::<WorkflowRun>().await.map_err(|e| {
            RemediationError::Pipeline(format!("GitHub get run parse failed: {e}"))
        })?;
        Ok(Some(run.to_handle()))
    }
}

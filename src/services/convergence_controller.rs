//! Convergence Controller.
//!
//! Drives the remediation loop: observe the pipeline, diagnose a failure,
//! gate and commit a fix, push it, and watch the run it triggers. Each
//! iteration appends exactly one [`IterationRecord`] (plus a half-step
//! `success` record when the fix's own run passes). Errors never escape an
//! iteration; they become outcomes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainResult, RemediationError};
use crate::domain::models::{
    Config, DiagnosticMode, IterationHistory, IterationOutcome, IterationRecord, RunHandle,
};
use crate::domain::ports::{EvidenceCollector, Oracle, PipelineProvider, SourceRepository};
use crate::services::oracle_client::OracleClient;
use crate::services::run_poller::{PollOutcome, RunPoller};
use crate::services::safe_apply_gate::SafeApplyGate;

/// Loop parameters taken from [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub max_iterations: u32,
    pub min_confidence: u8,
    pub oracle_mode: DiagnosticMode,
    pub run_timeout: Duration,
    pub new_run_timeout: Duration,
    pub remote: String,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_iterations: config.convergence.max_iterations,
            min_confidence: config.policy.unattended_min_confidence,
            oracle_mode: config.convergence.oracle_mode,
            run_timeout: Duration::from_secs(config.poll.run_timeout_secs),
            new_run_timeout: Duration::from_secs(config.poll.new_run_timeout_secs),
            remote: config.gate.remote.clone(),
        }
    }
}

/// Wall-clock time advanced by the runtime's monotonic clock.
///
/// Fix branch names are derived from this, so they stay strictly ordered
/// across iterations even if the system clock is adjusted mid-session.
#[derive(Debug, Clone, Copy)]
struct SessionClock {
    wall: DateTime<Utc>,
    mono: Instant,
}

impl SessionClock {
    fn start() -> Self {
        Self {
            wall: Utc::now(),
            mono: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.mono.elapsed())
            .ok()
            .and_then(|elapsed| self.wall.checked_add_signed(elapsed))
            .unwrap_or_else(Utc::now)
    }
}

/// What one iteration produced.
enum Step {
    /// Loop ends with this record.
    Terminal(IterationRecord),
    /// Fix pushed and its run passed.
    Converged {
        record: IterationRecord,
        half_step: IterationRecord,
    },
    /// Fix pushed, its run failed; keep going on `branch`.
    Continue {
        record: IterationRecord,
        branch: String,
    },
}

/// Result of observing the watched branch.
enum Observation {
    Failed(RunHandle),
    Terminal(IterationRecord),
}

/// The remediation loop over the four ports.
pub struct ConvergenceController<R, P, O, E>
where
    R: SourceRepository + ?Sized,
    P: PipelineProvider + ?Sized,
    O: Oracle + ?Sized,
    E: EvidenceCollector + ?Sized,
{
    repo: Arc<R>,
    gate: SafeApplyGate<R>,
    poller: RunPoller<P>,
    oracle: OracleClient<O>,
    evidence: Arc<E>,
    settings: ControllerSettings,
}

impl<R, P, O, E> ConvergenceController<R, P, O, E>
where
    R: SourceRepository + ?Sized,
    P: PipelineProvider + ?Sized,
    O: Oracle + ?Sized,
    E: EvidenceCollector + ?Sized,
{
    pub fn new(
        repo: Arc<R>,
        pipeline: Arc<P>,
        oracle: Arc<O>,
        evidence: Arc<E>,
        config: &Config,
    ) -> Self {
        Self {
            gate: SafeApplyGate::new(Arc::clone(&repo), config.gate.clone()),
            repo,
            poller: RunPoller::new(pipeline, Duration::from_secs(config.poll.interval_secs)),
            oracle: OracleClient::new(oracle),
            evidence,
            settings: ControllerSettings::from_config(config),
        }
    }

    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Run the loop against `branch` until a terminal outcome.
    pub async fn run(&self, branch: &str) -> DomainResult<IterationHistory> {
        self.run_observed(branch, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `observe` after every appended record.
    #[instrument(skip(self, observe), fields(session = %Uuid::new_v4()))]
    pub async fn run_observed<F>(&self, branch: &str, mut observe: F) -> DomainResult<IterationHistory>
    where
        F: FnMut(&IterationRecord) + Send,
    {
        if self.settings.max_iterations == 0 {
            return Err(RemediationError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        let clock = SessionClock::start();
        let mut history = IterationHistory::new();
        let mut watched = branch.to_string();
        info!(max_iterations = self.settings.max_iterations, "Starting remediation loop");

        for index in 1..=self.settings.max_iterations {
            let last = index == self.settings.max_iterations;
            match self.iterate(index, &watched, last, &clock).await {
                Step::Terminal(record) => {
                    info!(iteration = index, outcome = %record.outcome, "Loop finished");
                    observe(&record);
                    history.append(record);
                    break;
                }
                Step::Converged { record, half_step } => {
                    observe(&record);
                    history.append(record);
                    info!(iteration = index, "Fix verified by pipeline");
                    observe(&half_step);
                    history.append(half_step);
                    break;
                }
                Step::Continue { record, branch } => {
                    info!(iteration = index, branch = %branch, "Fix pushed but pipeline still failing");
                    observe(&record);
                    history.append(record);
                    watched = branch;
                }
            }
        }

        Ok(history)
    }

    async fn iterate(&self, index: u32, watched: &str, last: bool, clock: &SessionClock) -> Step {
        let failed_run = match self.observe_branch(index, watched).await {
            Observation::Failed(run) => run,
            Observation::Terminal(record) => return Step::Terminal(record),
        };

        let bundle = match self.evidence.collect(&failed_run, watched).await {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(iteration = index, error = %e, "Evidence collection failed");
                return Step::Terminal(
                    IterationRecord::new(index, IterationOutcome::OracleFailed)
                        .with_run(failed_run.id)
                        .with_detail(e.to_string()),
                );
            }
        };

        let record = match self.oracle.diagnose(&bundle, self.settings.oracle_mode).await {
            Ok(record) => record,
            Err(e) => {
                return Step::Terminal(
                    IterationRecord::new(index, IterationOutcome::OracleFailed)
                        .with_run(failed_run.id)
                        .with_detail(e.to_string()),
                );
            }
        };

        let confidence = record.effective_confidence();
        if confidence.map_or(true, |c| c < self.settings.min_confidence) {
            return Step::Terminal(
                IterationRecord::new(index, IterationOutcome::LowConfidence)
                    .with_confidence(confidence)
                    .with_run(failed_run.id)
                    .with_detail(format!(
                        "confidence {} is below the unattended threshold {}",
                        confidence.map_or_else(|| "absent".to_string(), |c| c.to_string()),
                        self.settings.min_confidence
                    )),
            );
        }

        let applied = match self
            .gate
            .execute_at(&record, self.settings.min_confidence, clock.now())
            .await
        {
            Ok(applied) => applied,
            Err(e) => {
                return Step::Terminal(
                    IterationRecord::new(index, IterationOutcome::ApplyFailed)
                        .with_confidence(confidence)
                        .with_run(failed_run.id)
                        .with_detail(e.to_string()),
                );
            }
        };

        if let Err(e) = self
            .repo
            .push_branch(&self.settings.remote, &applied.branch)
            .await
        {
            warn!(branch = %applied.branch, error = %e, "Push failed");
            return Step::Terminal(
                IterationRecord::new(index, IterationOutcome::PushFailed)
                    .with_confidence(confidence)
                    .with_branch(&applied.branch)
                    .with_detail(e.to_string()),
            );
        }
        info!(iteration = index, branch = %applied.branch, commit = %applied.commit, "Fix pushed");

        let deadline = Instant::now() + self.settings.new_run_timeout;
        let pushed = IterationRecord::new(index, IterationOutcome::FixPushed)
            .with_confidence(confidence)
            .with_branch(&applied.branch);

        match self
            .poller
            .await_new_run_completion(&applied.branch, Some(&failed_run.id), deadline)
            .await
        {
            Ok(PollOutcome::Completed(run)) if run.succeeded() => Step::Converged {
                half_step: IterationRecord::half_step_success(index)
                    .with_branch(&applied.branch)
                    .with_run(run.id.clone())
                    .with_detail(format!("run {} on {} succeeded", run.id, applied.branch)),
                record: pushed
                    .with_run(run.id)
                    .with_detail(format!("commit {}", applied.commit)),
            },
            Ok(PollOutcome::Completed(run)) if last => Step::Terminal(
                IterationRecord::new(index, IterationOutcome::MaxIterations)
                    .with_confidence(confidence)
                    .with_branch(&applied.branch)
                    .with_run(run.id)
                    .with_detail(format!(
                        "pipeline still failing after {index} iterations"
                    )),
            ),
            Ok(PollOutcome::Completed(run)) => Step::Continue {
                record: pushed
                    .with_run(run.id.clone())
                    .with_detail(format!("run {} failed", run.id)),
                branch: applied.branch,
            },
            Ok(PollOutcome::TimedOut) => Step::Terminal(
                IterationRecord::new(index, IterationOutcome::Timeout)
                    .with_confidence(confidence)
                    .with_branch(&applied.branch)
                    .with_detail(format!(
                        "no completed run on {} within {}s",
                        applied.branch,
                        self.settings.new_run_timeout.as_secs()
                    )),
            ),
            Err(e) => Step::Terminal(
                IterationRecord::new(index, IterationOutcome::Timeout)
                    .with_confidence(confidence)
                    .with_branch(&applied.branch)
                    .with_detail(format!("pipeline query failed: {e}")),
            ),
        }
    }

    /// Step 1: find out whether the watched branch is failing.
    async fn observe_branch(&self, index: u32, watched: &str) -> Observation {
        let deadline = Instant::now() + self.settings.run_timeout;
        let waited = async {
            match self.poller.current_run(watched).await? {
                Some(run) if run.is_completed() => Ok(PollOutcome::Completed(run)),
                Some(run) => self.poller.await_completion(&run.id, deadline).await,
                None => self.poller.await_any_completion(watched, deadline).await,
            }
        };

        match waited.await {
            Ok(PollOutcome::Completed(run)) if run.succeeded() => Observation::Terminal(
                IterationRecord::new(index, IterationOutcome::Success)
                    .with_detail(format!("run {} on {watched} succeeded", run.id))
                    .with_run(run.id),
            ),
            Ok(PollOutcome::Completed(run)) => {
                info!(iteration = index, run = %run.id, "Pipeline failing");
                Observation::Failed(run)
            }
            Ok(PollOutcome::TimedOut) => Observation::Terminal(
                IterationRecord::new(index, IterationOutcome::Timeout).with_detail(format!(
                    "no completed run on {watched} within {}s",
                    self.settings.run_timeout.as_secs()
                )),
            ),
            Err(e) => Observation::Terminal(
                IterationRecord::new(index, IterationOutcome::Timeout)
                    .with_detail(format!("pipeline query failed: {e}")),
            ),
        }
    }
}

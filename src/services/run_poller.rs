//! Run Poller.
//!
//! Observes pipeline runs with fixed-interval polling bounded by an absolute
//! deadline. Runs are matched by identity only; timestamps are never compared.
//! Provider errors are not retried: the only thing the poller retries is a
//! state it has not observed yet.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{RunHandle, RunId};
use crate::domain::ports::PipelineProvider;

/// Result of a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed(RunHandle),
    TimedOut,
}

impl PollOutcome {
    pub const fn completed(&self) -> Option<&RunHandle> {
        match self {
            Self::Completed(run) => Some(run),
            Self::TimedOut => None,
        }
    }
}

/// Deadline-bounded poller over a [`PipelineProvider`].
pub struct RunPoller<P: PipelineProvider + ?Sized> {
    provider: Arc<P>,
    interval: Duration,
}

impl<P: PipelineProvider + ?Sized> RunPoller<P> {
    pub fn new(provider: Arc<P>, interval: Duration) -> Self {
        Self { provider, interval }
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Most recent run on `branch`, if any.
    pub async fn current_run(&self, branch: &str) -> DomainResult<Option<RunHandle>> {
        self.provider.latest_run(branch).await
    }

    /// Wait for a known run to complete.
    #[instrument(skip(self), fields(run = %id))]
    pub async fn await_completion(&self, id: &RunId, deadline: Instant) -> DomainResult<PollOutcome> {
        self.poll_until(deadline, || async move {
            Ok(self.provider.run(id).await?.filter(RunHandle::is_completed))
        })
        .await
    }

    /// Wait for a run on `branch` whose id differs from `previous`, then for it
    /// to complete. Both phases share one deadline.
    #[instrument(skip(self, previous), fields(previous = ?previous.map(RunId::as_str)))]
    pub async fn await_new_run_completion(
        &self,
        branch: &str,
        previous: Option<&RunId>,
        deadline: Instant,
    ) -> DomainResult<PollOutcome> {
        let appeared = self
            .poll_until(deadline, || async move {
                Ok(self
                    .provider
                    .latest_run(branch)
                    .await?
                    .filter(|run| Some(&run.id) != previous))
            })
            .await?;

        match appeared {
            PollOutcome::Completed(run) if run.is_completed() => Ok(PollOutcome::Completed(run)),
            PollOutcome::Completed(run) => {
                debug!(run = %run.id, "New run observed");
                self.await_completion(&run.id, deadline).await
            }
            PollOutcome::TimedOut => Ok(PollOutcome::TimedOut),
        }
    }

    /// Wait for whatever run shows up on `branch` to complete.
    pub async fn await_any_completion(
        &self,
        branch: &str,
        deadline: Instant,
    ) -> DomainResult<PollOutcome> {
        self.await_new_run_completion(branch, None, deadline).await
    }

    /// Query until `probe` yields a run or the deadline passes.
    ///
    /// Each query is itself cut off at the deadline; the sleep between queries
    /// never extends past it.
    async fn poll_until<F, Fut>(&self, deadline: Instant, mut probe: F) -> DomainResult<PollOutcome>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = DomainResult<Option<RunHandle>>>,
    {
        loop {
            match timeout_at(deadline, probe()).await {
                Ok(Ok(Some(run))) => return Ok(PollOutcome::Completed(run)),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(PollOutcome::TimedOut),
            }

            let next = Instant::now() + self.interval;
            if next >= deadline {
                sleep_until(deadline).await;
                return Ok(PollOutcome::TimedOut);
            }
            sleep_until(next).await;
        }
    }
}

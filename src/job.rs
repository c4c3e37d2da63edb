//! Polling of long-running server-side jobs.
//!
//! A submission that cannot be answered inline returns a status URL. An
//! [`AsyncJob`] owns that URL and polls it until the job completes, fails,
//! the attempt budget runs out, or the caller cancels.

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{RenamedError, Result};
use crate::http::HttpClient;
use crate::types::{JobStatus, JobStatusResponse};

/// Delay between status checks when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Status checks allowed per `wait` when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

/// Where job status documents come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetches the raw status document behind `status_url`.
    async fn fetch_status(&self, status_url: &str) -> Result<Value>;
}

#[async_trait]
impl StatusSource for HttpClient {
    /// One GET per call. Polling has its own budget, so the request-level
    /// retry policy does not apply here.
    async fn fetch_status(&self, status_url: &str) -> Result<Value> {
        let (_, value) = self.send_once(Method::GET, status_url, None).await?;
        Ok(value)
    }
}

/// Where the poller stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Polling,
    Completed,
    /// The job failed, or polling stopped on an error.
    Failed,
    TimedOut,
    Cancelled,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobPhase::Polling)
    }

    fn after(outcome: &Result<impl Sized>) -> Self {
        match outcome {
            Ok(_) => JobPhase::Completed,
            Err(RenamedError::Timeout { .. }) => JobPhase::TimedOut,
            Err(RenamedError::Cancelled) => JobPhase::Cancelled,
            Err(_) => JobPhase::Failed,
        }
    }
}

/// Handle to a job running on the service.
///
/// The status URL is an opaque capability handed out by the service and never
/// changes. Re-waiting after a timeout starts a fresh attempt budget; waiting
/// again after completion or failure just re-polls and is best avoided.
pub struct AsyncJob<T> {
    source: Arc<dyn StatusSource>,
    status_url: String,
    poll_interval: Duration,
    max_attempts: u32,
    phase: JobPhase,
    _result: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for AsyncJob<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncJob")
            .field("status_url", &self.status_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_attempts", &self.max_attempts)
            .field("phase", &self.phase)
            .finish()
    }
}

impl<T: DeserializeOwned> AsyncJob<T> {
    pub fn new(source: Arc<dyn StatusSource>, status_url: impl Into<String>) -> Self {
        Self {
            source,
            status_url: status_url.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            phase: JobPhase::Polling,
            _result: PhantomData,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Polls until the job finishes.
    pub async fn wait(&mut self) -> Result<T> {
        self.wait_with_cancel(&CancellationToken::new(), |_| {})
            .await
    }

    /// Polls until the job finishes, calling `on_progress` for every
    /// non-terminal status.
    pub async fn wait_with_progress<F>(&mut self, on_progress: F) -> Result<T>
    where
        F: FnMut(&JobStatusResponse<T>),
    {
        self.wait_with_cancel(&CancellationToken::new(), on_progress)
            .await
    }

    /// Polls until the job finishes or `cancel` fires.
    ///
    /// `on_progress` runs synchronously once per non-terminal status, before
    /// the following sleep. Cancellation is checked before each request and
    /// raced against both the in-flight request and the sleep; once observed
    /// no further requests are sent and the result is
    /// [`RenamedError::Cancelled`].
    #[tracing::instrument(skip(self, cancel, on_progress), fields(status_url = %self.status_url))]
    pub async fn wait_with_cancel<F>(
        &mut self,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<T>
    where
        F: FnMut(&JobStatusResponse<T>),
    {
        self.phase = JobPhase::Polling;
        let outcome = self.poll(cancel, &mut on_progress).await;
        self.phase = JobPhase::after(&outcome);
        debug!("Job at {} ended in phase {:?}", self.status_url, self.phase);
        outcome
    }

    async fn poll<F>(&self, cancel: &CancellationToken, on_progress: &mut F) -> Result<T>
    where
        F: FnMut(&JobStatusResponse<T>),
    {
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return Err(RenamedError::Cancelled);
            }

            let value = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RenamedError::Cancelled),
                value = self.source.fetch_status(&self.status_url) => value?,
            };

            let status: JobStatusResponse<T> = serde_json::from_value(value)
                .map_err(|e| RenamedError::decode("Invalid job status", e))?;

            debug!(
                "Job {} is {} ({}%), check {}/{}",
                status.job_id, status.status, status.progress, attempt, self.max_attempts
            );

            match status.status {
                JobStatus::Completed => {
                    return status.result.ok_or_else(|| {
                        RenamedError::malformed(format!(
                            "Job {} completed without a result",
                            status.job_id
                        ))
                    });
                }
                JobStatus::Failed => {
                    return Err(RenamedError::JobFailed {
                        message: status
                            .error
                            .unwrap_or_else(|| format!("Job {} failed", status.job_id)),
                    });
                }
                JobStatus::Pending | JobStatus::Processing => {
                    on_progress(&status);

                    if attempt < self.max_attempts {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => return Err(RenamedError::Cancelled),
                            _ = tokio::time::sleep(self.poll_interval) => {}
                        }
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(RenamedError::Cancelled);
        }

        Err(RenamedError::Timeout {
            attempts: self.max_attempts,
        })
    }
}

//! Parse-job client: submission, polling and waiting for an outcome.
//!
//! [`JobClient`] drives jobs through a shared [`JobTransport`]. Each job
//! is driven by its own future with its own local retry and poll state, so
//! any number of jobs can be awaited concurrently from one client.
//!
//! Lifecycle events are broadcast via a [`tokio::sync::broadcast`]
//! channel. Call [`JobClient::subscribe`] to receive them.

use std::sync::Arc;
use std::time::Duration;

use ade_core::request::JobRequest;
use ade_core::status::{JobState, JobStatus, UNKNOWN_FAILURE_REASON};
use ade_core::types::{JobHandle, JobResult};
use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::events::{JobEvent, EVENT_CHANNEL_CAPACITY};
use crate::http::{HttpConfig, HttpTransport};
use crate::retry::{retry_transient, RetryConfig};
use crate::transport::{JobTransport, TransportError};

/// Delay between status polls, as in the documented polling loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default wall-clock budget for waiting on a single job.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Polling and retry settings for [`JobClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Delay between consecutive polls of one job.
    pub poll_interval: Duration,
    /// Budget for a whole [`JobClient::await_completion`] call.
    pub wait_timeout: Duration,
    /// Backoff policy for transient failures.
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }
}

/// Client for the asynchronous parse-jobs workflow.
///
/// Cloning is cheap and clones share the transport and event channel.
#[derive(Clone)]
pub struct JobClient {
    transport: Arc<dyn JobTransport>,
    config: ClientConfig,
    event_tx: broadcast::Sender<JobEvent>,
}

impl JobClient {
    pub fn new(transport: Arc<dyn JobTransport>, config: ClientConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            config,
            event_tx,
        }
    }

    /// Client backed by [`HttpTransport`].
    pub fn http(http: &HttpConfig, config: ClientConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(http)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.event_tx.subscribe()
    }

    /// Submit a request once, without retrying.
    ///
    /// Requests without exactly one document source are rejected as
    /// [`JobError::Fatal`] before anything is sent.
    pub async fn submit(&self, request: &JobRequest) -> Result<JobHandle, JobError> {
        request
            .validate()
            .map_err(|e| JobError::Fatal(TransportError::InvalidRequest(e)))?;

        let handle = self
            .transport
            .submit(request)
            .await
            .map_err(JobError::classify)?;

        self.record_submission(&handle);
        Ok(handle)
    }

    /// Fetch the current status of a job once, without retrying.
    pub async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, JobError> {
        self.transport
            .status(handle)
            .await
            .map_err(JobError::classify)
    }

    /// Submit a request, retrying transient failures with exponential
    /// backoff.
    ///
    /// Returns [`JobError::RetriesExhausted`] once the attempt budget is
    /// spent and [`JobError::Fatal`] on the first non-retryable failure.
    pub async fn submit_with_retry(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<JobHandle, JobError> {
        request
            .validate()
            .map_err(|e| JobError::Fatal(TransportError::InvalidRequest(e)))?;

        let transport = &self.transport;
        let handle = retry_transient(
            "submit",
            &self.config.retry,
            cancel,
            |attempt, delay, error| self.emit_retry(None, attempt, delay, error),
            || transport.submit(request),
        )
        .await?;

        self.record_submission(&handle);
        Ok(handle)
    }

    /// Poll `handle` every `poll_interval` until it reaches a terminal
    /// state, `timeout` elapses, or `cancel` fires.
    ///
    /// The first poll happens immediately. Transient poll failures are
    /// retried with the client's backoff policy; the backoff counts
    /// against `timeout`. When the budget runs out the in-flight poll is
    /// dropped and no further poll is issued. A terminal status observed
    /// exactly at the deadline still wins. A `timeout` too large to
    /// represent as an instant means no deadline.
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        poll_interval: Duration,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<JobResult, JobError> {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %handle, "Stopped waiting for job");
                Err(JobError::WaitCancelled)
            }
            outcome = self.poll_until_terminal(handle, poll_interval, cancel) => outcome,
            _ = expired => {
                let waited = started.elapsed();
                tracing::warn!(
                    job_id = %handle,
                    waited_ms = waited.as_millis() as u64,
                    "Timed out waiting for job",
                );
                self.emit(JobEvent::TimedOut {
                    job_id: handle.clone(),
                    waited_ms: waited.as_millis() as u64,
                });
                Err(JobError::JobTimeout { job_id: handle.clone(), waited })
            }
        }
    }

    /// Submit `request` and wait for its outcome using the configured poll
    /// interval and wait timeout.
    pub async fn run(
        &self,
        request: &JobRequest,
        cancel: &CancellationToken,
    ) -> Result<JobResult, JobError> {
        let handle = self.submit_with_retry(request, cancel).await?;
        self.await_completion(
            &handle,
            self.config.poll_interval,
            self.config.wait_timeout,
            cancel,
        )
        .await
    }

    /// Drive several jobs concurrently.
    ///
    /// Returns one outcome per request, in input order. A failure of one
    /// job does not affect the others.
    pub async fn run_many(
        &self,
        requests: &[JobRequest],
        cancel: &CancellationToken,
    ) -> Vec<Result<JobResult, JobError>> {
        tracing::info!(count = requests.len(), "Running parse jobs concurrently");
        join_all(requests.iter().map(|request| self.run(request, cancel))).await
    }

    // ---- private helpers ----

    async fn poll_until_terminal(
        &self,
        handle: &JobHandle,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<JobResult, JobError> {
        let mut polls = 0u32;

        loop {
            let status = self.poll_with_retry(handle, cancel).await?;
            polls += 1;

            tracing::debug!(
                job_id = %handle,
                polls,
                status = %status.state,
                progress = status.progress,
                "Polled job status",
            );
            self.emit(JobEvent::Progress {
                job_id: handle.clone(),
                state: status.state,
                progress: status.progress,
            });

            match status.state {
                JobState::Completed => {
                    tracing::info!(job_id = %handle, polls, "Job completed");
                    self.emit(JobEvent::Completed {
                        job_id: handle.clone(),
                    });
                    return Ok(status.result.unwrap_or_else(|| JobResult {
                        job_id: handle.clone(),
                        data: serde_json::Value::Null,
                        output_url: None,
                    }));
                }
                JobState::Failed => {
                    let reason = status
                        .failure_reason
                        .unwrap_or_else(|| UNKNOWN_FAILURE_REASON.to_string());
                    tracing::error!(job_id = %handle, reason = %reason, "Job failed");
                    self.emit(JobEvent::Failed {
                        job_id: handle.clone(),
                        reason: reason.clone(),
                    });
                    return Err(JobError::JobFailed {
                        job_id: handle.clone(),
                        reason,
                    });
                }
                JobState::Cancelled => {
                    tracing::warn!(job_id = %handle, "Job was cancelled by the service");
                    self.emit(JobEvent::Cancelled {
                        job_id: handle.clone(),
                    });
                    return Err(JobError::JobCancelled {
                        job_id: handle.clone(),
                    });
                }
                JobState::Pending | JobState::Processing => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(JobError::WaitCancelled),
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    async fn poll_with_retry(
        &self,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<JobStatus, JobError> {
        let transport = &self.transport;
        retry_transient(
            "poll",
            &self.config.retry,
            cancel,
            |attempt, delay, error| self.emit_retry(Some(handle), attempt, delay, error),
            || transport.status(handle),
        )
        .await
    }

    fn record_submission(&self, handle: &JobHandle) {
        tracing::info!(job_id = %handle, "Parse job submitted");
        self.emit(JobEvent::Submitted {
            job_id: handle.clone(),
            submitted_at: chrono::Utc::now(),
        });
    }

    fn emit_retry(
        &self,
        job_id: Option<&JobHandle>,
        attempt: u32,
        delay: Duration,
        error: &TransportError,
    ) {
        self.emit(JobEvent::RetryScheduled {
            job_id: job_id.cloned(),
            attempt,
            delay_ms: delay.as_millis() as u64,
            error: error.to_string(),
        });
    }

    /// Publish an event; having no subscribers is fine.
    fn emit(&self, event: JobEvent) {
        let _ = self.event_tx.send(event);
    }
}

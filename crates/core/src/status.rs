//! Job status state machine and status-payload decoding.
//!
//! A job moves `pending -> processing -> {completed, failed, cancelled}`.
//! `pending` and `processing` may alternate while the service schedules
//! work, but nothing ever leaves a terminal state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{JobHandle, JobResult};

/// Wire name of the pending state.
pub const STATE_PENDING: &str = "pending";

/// Wire name of the processing state.
pub const STATE_PROCESSING: &str = "processing";

/// Wire name of the completed state.
pub const STATE_COMPLETED: &str = "completed";

/// Wire name of the failed state.
pub const STATE_FAILED: &str = "failed";

/// Wire name of the cancelled state.
pub const STATE_CANCELLED: &str = "cancelled";

/// Reason reported when the service marks a job failed without saying why.
pub const UNKNOWN_FAILURE_REASON: &str = "no failure reason reported";

/// Lifecycle state of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => STATE_PENDING,
            Self::Processing => STATE_PROCESSING,
            Self::Completed => STATE_COMPLETED,
            Self::Failed => STATE_FAILED,
            Self::Cancelled => STATE_CANCELLED,
        }
    }

    /// `true` for completed, failed and cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            STATE_PENDING => Ok(Self::Pending),
            STATE_PROCESSING => Ok(Self::Processing),
            STATE_COMPLETED => Ok(Self::Completed),
            STATE_FAILED => Ok(Self::Failed),
            STATE_CANCELLED => Ok(Self::Cancelled),
            _ => Err(CoreError::UnknownJobState(s.to_string())),
        }
    }
}

/// One observation of a job, replaced wholesale on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub job_id: JobHandle,
    pub state: JobState,
    /// Fraction complete, always within `[0, 1]`.
    pub progress: f64,
    /// Only set when `state` is [`JobState::Failed`].
    pub failure_reason: Option<String>,
    /// Only set when `state` is [`JobState::Completed`].
    pub result: Option<JobResult>,
}

/// Status body as returned by the service.
#[derive(Debug, Deserialize)]
struct RawJobStatus {
    #[serde(default)]
    job_id: Option<String>,
    status: String,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default, alias = "result")]
    data: Option<serde_json::Value>,
    #[serde(default)]
    output_url: Option<String>,
}

impl JobStatus {
    pub fn pending(job_id: JobHandle, progress: f64) -> Self {
        Self::in_flight(job_id, JobState::Pending, progress)
    }

    pub fn processing(job_id: JobHandle, progress: f64) -> Self {
        Self::in_flight(job_id, JobState::Processing, progress)
    }

    pub fn completed(job_id: JobHandle, data: serde_json::Value) -> Self {
        Self {
            result: Some(JobResult {
                job_id: job_id.clone(),
                data,
                output_url: None,
            }),
            job_id,
            state: JobState::Completed,
            progress: 1.0,
            failure_reason: None,
        }
    }

    pub fn failed(job_id: JobHandle, reason: impl Into<String>) -> Self {
        Self {
            job_id,
            state: JobState::Failed,
            progress: 0.0,
            failure_reason: Some(reason.into()),
            result: None,
        }
    }

    pub fn cancelled(job_id: JobHandle) -> Self {
        Self::in_flight(job_id, JobState::Cancelled, 0.0)
    }

    fn in_flight(job_id: JobHandle, state: JobState, progress: f64) -> Self {
        Self {
            job_id,
            state,
            progress: clamp_progress(progress),
            failure_reason: None,
            result: None,
        }
    }

    /// Decode a status body for `handle`.
    ///
    /// The body's own `job_id` wins when present. Progress is clamped into
    /// `[0, 1]`; a missing progress is `0.0`, or `1.0` once completed.
    /// The result payload is kept only for completed jobs and the failure
    /// reason only for failed ones.
    pub fn from_wire(body: serde_json::Value, handle: &JobHandle) -> Result<Self, CoreError> {
        let raw: RawJobStatus = serde_json::from_value(body)
            .map_err(|e| CoreError::MalformedStatus(e.to_string()))?;

        let state: JobState = raw.status.parse()?;
        let job_id = raw
            .job_id
            .filter(|id| !id.is_empty())
            .map(JobHandle::new)
            .unwrap_or_else(|| handle.clone());

        let progress = match raw.progress {
            Some(p) if p.is_finite() => clamp_progress(p),
            Some(p) => {
                return Err(CoreError::MalformedStatus(format!(
                    "progress must be a finite number, got {p}"
                )))
            }
            None if state == JobState::Completed => 1.0,
            None => 0.0,
        };

        let result = (state == JobState::Completed).then(|| JobResult {
            job_id: job_id.clone(),
            data: raw.data.unwrap_or(serde_json::Value::Null),
            output_url: raw.output_url,
        });

        let failure_reason = (state == JobState::Failed).then(|| {
            raw.failure_reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_FAILURE_REASON.to_string())
        });

        Ok(Self {
            job_id,
            state,
            progress,
            failure_reason,
            result,
        })
    }
}

fn clamp_progress(progress: f64) -> f64 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

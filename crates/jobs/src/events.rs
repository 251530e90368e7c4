//! Lifecycle events published by the job client.
//!
//! Events go out on a [`tokio::sync::broadcast`] channel; call
//! [`JobClient::subscribe`](crate::client::JobClient::subscribe) to
//! receive them. Nothing is buffered for late subscribers.

use ade_core::status::JobState;
use ade_core::types::{JobHandle, Timestamp};
use serde::Serialize;

/// Broadcast channel capacity for job events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A state change observed while driving a job.
#[derive(Debug, Clone, Serialize)]
pub enum JobEvent {
    /// The service accepted a request.
    Submitted {
        job_id: JobHandle,
        submitted_at: Timestamp,
    },

    /// A poll returned a non-terminal or terminal status.
    Progress {
        job_id: JobHandle,
        state: JobState,
        /// Fraction complete (0-1).
        progress: f64,
    },

    /// A transient failure will be retried after `delay_ms`.
    RetryScheduled {
        /// `None` while the job has not been submitted yet.
        job_id: Option<JobHandle>,
        /// Zero-based index of the failed attempt.
        attempt: u32,
        delay_ms: u64,
        error: String,
    },

    /// The job completed successfully.
    Completed { job_id: JobHandle },

    /// The job failed; `reason` is the service's text verbatim.
    Failed { job_id: JobHandle, reason: String },

    /// The service cancelled the job.
    Cancelled { job_id: JobHandle },

    /// The client stopped waiting; the job may still be running.
    TimedOut { job_id: JobHandle, waited_ms: u64 },
}

impl JobEvent {
    /// Handle of the job the event is about, if it has one yet.
    pub fn job_id(&self) -> Option<&JobHandle> {
        match self {
            Self::RetryScheduled { job_id, .. } => job_id.as_ref(),
            Self::Submitted { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Completed { job_id }
            | Self::Failed { job_id, .. }
            | Self::Cancelled { job_id }
            | Self::TimedOut { job_id, .. } => Some(job_id),
        }
    }
}

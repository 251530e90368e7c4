//! Errors surfaced by [`JobClient`](crate::client::JobClient).
//!
//! Two families, which callers usually handle separately:
//!
//! * could not talk to the service: [`JobError::Fatal`],
//!   [`JobError::Transient`], [`JobError::RetriesExhausted`];
//! * the service ran the job and reported an outcome other than success:
//!   [`JobError::JobFailed`], [`JobError::JobCancelled`],
//!   [`JobError::JobTimeout`].
//!
//! [`JobError::WaitCancelled`] belongs to neither: the caller gave up.

use std::time::Duration;

use ade_core::types::JobHandle;

use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// Invalid request or authentication failure. Never retried.
    #[error("Fatal request error: {0}")]
    Fatal(#[source] TransportError),

    /// Rate limiting, connection failure or timeout on a single call.
    #[error("Transient request error: {0}")]
    Transient(#[source] TransportError),

    /// The retry budget ran out; carries the last transient failure.
    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: TransportError,
    },

    /// The service reported the job as failed.
    #[error("Job {job_id} failed: {reason}")]
    JobFailed { job_id: JobHandle, reason: String },

    /// The service reported the job as cancelled.
    #[error("Job {job_id} was cancelled")]
    JobCancelled { job_id: JobHandle },

    /// The wait budget elapsed while the job was still pending or
    /// processing. The job may still be running server-side.
    #[error("Timed out after {waited:?} waiting for job {job_id}")]
    JobTimeout { job_id: JobHandle, waited: Duration },

    /// The caller cancelled the operation. Remote work is unaffected.
    #[error("Cancelled by caller")]
    WaitCancelled,
}

impl JobError {
    /// Split a single-call failure into fatal or transient.
    pub fn classify(err: TransportError) -> Self {
        if err.is_transient() {
            Self::Transient(err)
        } else {
            Self::Fatal(err)
        }
    }

    /// `true` when the service could not be reached or kept failing
    /// transiently.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RetriesExhausted { .. })
    }

    /// `true` when the error describes what happened to the job itself
    /// rather than a communication failure.
    pub fn is_job_outcome(&self) -> bool {
        matches!(
            self,
            Self::JobFailed { .. } | Self::JobCancelled { .. } | Self::JobTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn classify_splits_on_transience() {
        assert_matches!(
            JobError::classify(TransportError::http(503, "busy")),
            JobError::Transient(TransportError::Http { status: 503, .. })
        );
        assert_matches!(
            JobError::classify(TransportError::http(401, "bad key")),
            JobError::Fatal(TransportError::Http { status: 401, .. })
        );
    }

    #[test]
    fn communication_and_outcome_families_are_disjoint() {
        let errors = [
            JobError::Fatal(TransportError::http(400, "")),
            JobError::Transient(TransportError::Timeout),
            JobError::RetriesExhausted {
                attempts: 3,
                last: TransportError::Timeout,
            },
            JobError::JobFailed {
                job_id: "j".into(),
                reason: "r".into(),
            },
            JobError::JobCancelled { job_id: "j".into() },
            JobError::JobTimeout {
                job_id: "j".into(),
                waited: Duration::from_secs(1),
            },
            JobError::WaitCancelled,
        ];

        for err in &errors {
            assert!(!(err.is_transient() && err.is_job_outcome()), "{err}");
        }
        assert_eq!(errors.iter().filter(|e| e.is_transient()).count(), 2);
        assert_eq!(errors.iter().filter(|e| e.is_job_outcome()).count(), 3);
    }

    #[test]
    fn failure_reason_is_in_message() {
        let err = JobError::JobFailed {
            job_id: "job-1".into(),
            reason: "page limit exceeded".into(),
        };
        assert_eq!(err.to_string(), "Job job-1 failed: page limit exceeded");
    }
}

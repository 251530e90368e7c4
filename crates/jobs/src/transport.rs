//! Transport seam between the job client and the remote service.
//!
//! [`JobTransport`] covers the two remote calls the client needs. The
//! production implementation is [`HttpTransport`](crate::http::HttpTransport);
//! tests substitute scripted transports.

use std::time::Duration;

use ade_core::error::CoreError;
use ade_core::request::JobRequest;
use ade_core::status::JobStatus;
use ade_core::types::JobHandle;
use async_trait::async_trait;

/// The two remote calls behind the parse-jobs workflow.
///
/// Implementations are shared across concurrently driven jobs, so they
/// must be `Send + Sync`.
#[async_trait]
pub trait JobTransport: Send + Sync {
    /// Submit a request and return the server-assigned handle.
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, TransportError>;

    /// Fetch the current status of a job.
    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, TransportError>;
}

/// Failures of a single remote call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request was rejected locally before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] CoreError),

    /// The HTTP request could not be built (bad base URL, header, etc.).
    #[error("Failed to build request: {0}")]
    Builder(String),

    /// Network, DNS or TLS failure.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request did not complete within the transport timeout.
    #[error("Request timed out")]
    Timeout,

    /// The service returned a non-2xx status code.
    #[error("ADE API error ({status}): {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
        /// Parsed `Retry-After` header, when the service sent one.
        retry_after: Option<Duration>,
    },

    /// A 2xx response whose body could not be understood.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// HTTP status used by the service for rate limiting.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// HTTP status for a server-side request timeout.
pub const STATUS_REQUEST_TIMEOUT: u16 = 408;

impl TransportError {
    /// Whether retrying the same call may succeed.
    ///
    /// Connection failures, timeouts, 408, 429 and 5xx are transient.
    /// Everything else (other 4xx, undecodable bodies, local validation)
    /// is fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::Http { status, .. } => {
                *status == STATUS_TOO_MANY_REQUESTS
                    || *status == STATUS_REQUEST_TIMEOUT
                    || (500..600).contains(status)
            }
            Self::InvalidRequest(_) | Self::Builder(_) | Self::Decode(_) => false,
        }
    }

    /// `true` for HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status == STATUS_TOO_MANY_REQUESTS)
    }

    /// Server-requested wait before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
            retry_after: None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_builder() {
            Self::Builder(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(TransportError::http(status, "").is_transient(), "{status}");
        }
    }

    #[test]
    fn client_errors_are_fatal() {
        for status in [400, 401, 403, 404, 413, 422] {
            assert!(!TransportError::http(status, "").is_transient(), "{status}");
        }
    }

    #[test]
    fn network_failures_are_transient() {
        assert!(TransportError::Connection("reset".into()).is_transient());
        assert!(TransportError::Timeout.is_transient());
    }

    #[test]
    fn local_and_decode_failures_are_fatal() {
        assert!(!TransportError::Decode("eof".into()).is_transient());
        assert!(!TransportError::Builder("bad url".into()).is_transient());
        assert!(!TransportError::InvalidRequest(CoreError::Validation("x".into())).is_transient());
    }

    #[test]
    fn only_429_counts_as_rate_limited() {
        assert!(TransportError::http(429, "").is_rate_limited());
        assert!(!TransportError::http(503, "").is_rate_limited());
        assert!(!TransportError::Timeout.is_rate_limited());
    }

    #[test]
    fn retry_after_only_from_http_errors() {
        let err = TransportError::Http {
            status: 429,
            body: String::new(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(TransportError::Timeout.retry_after(), None);
    }
}

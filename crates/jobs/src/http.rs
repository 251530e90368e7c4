//! REST client for the ADE parse-jobs endpoints.
//!
//! Wraps `POST /v1/ade/parse/jobs` (submission) and
//! `GET /v1/ade/parse/jobs/{job_id}` (status) using [`reqwest`].

use std::time::Duration;

use ade_core::request::{JobRequest, DOCUMENT_PART};
use ade_core::status::JobStatus;
use ade_core::types::JobHandle;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Deserialize;

use crate::transport::{JobTransport, TransportError};

/// Production ADE endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.va.landing.ai";

/// Path of the parse-jobs collection, relative to the base URL.
pub const PARSE_JOBS_PATH: &str = "/v1/ade/parse/jobs";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL, e.g. `https://api.va.landing.ai`.
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    /// Applies to each HTTP request, not to the overall job wait.
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Response returned by the submission endpoint.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued job.
    pub job_id: String,
}

/// HTTP transport for the ADE service.
///
/// Cheap to share: the inner [`reqwest::Client`] pools connections and is
/// safe to use from concurrently driven jobs.
pub struct HttpTransport {
    client: reqwest::Client,
    jobs_url: Url,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Build a transport with its own connection pool.
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Self::with_client(client, config)
    }

    /// Reuse an existing [`reqwest::Client`]. Its timeout settings win over
    /// [`HttpConfig::request_timeout`].
    pub fn with_client(client: reqwest::Client, config: &HttpConfig) -> Result<Self, TransportError> {
        let raw = format!("{}{PARSE_JOBS_PATH}", config.base_url.trim_end_matches('/'));
        let jobs_url = Url::parse(&raw)
            .map_err(|e| TransportError::Builder(format!("invalid base URL {raw}: {e}")))?;
        if jobs_url.cannot_be_a_base() {
            return Err(TransportError::Builder(format!("invalid base URL {raw}")));
        }

        Ok(Self {
            client,
            jobs_url,
            api_key: config.api_key.clone(),
        })
    }

    pub fn jobs_url(&self) -> &str {
        self.jobs_url.as_str()
    }

    /// URL of a single job. The handle is one percent-encoded path segment.
    pub fn job_url(&self, handle: &JobHandle) -> Url {
        let mut url = self.jobs_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(handle.as_str());
        }
        url
    }

    // ---- private helpers ----

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header(AUTHORIZATION, format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. On failure returns
    /// [`TransportError::Http`] with the status, body text and any
    /// `Retry-After` seconds.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        Err(TransportError::Http {
            status: status.as_u16(),
            body,
            retry_after,
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

/// Parse a `Retry-After` value: delay seconds or an HTTP-date.
///
/// Dates in the past mean "retry now".
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Encode a request as multipart form data: one text part per field and a
/// file part for an attached document.
fn build_form(request: &JobRequest) -> Form {
    let mut form = request
        .fields()
        .iter()
        .fold(Form::new(), |form, (key, value)| {
            form.text(key.clone(), value.clone())
        });

    if let Some(document) = request.attached_document() {
        let part = Part::bytes(document.bytes.clone()).file_name(document.file_name.clone());
        form = form.part(DOCUMENT_PART, part);
    }

    form
}

#[async_trait]
impl JobTransport for HttpTransport {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle, TransportError> {
        request.validate()?;

        let response = self
            .authorize(self.client.post(self.jobs_url.clone()))
            .multipart(build_form(request))
            .send()
            .await?;

        let body: SubmitResponse = Self::parse_response(response).await?;
        if body.job_id.trim().is_empty() {
            return Err(TransportError::Decode(
                "submission response has an empty job_id".to_string(),
            ));
        }
        Ok(JobHandle::new(body.job_id))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, TransportError> {
        let response = self
            .authorize(self.client.get(self.job_url(handle)))
            .send()
            .await?;

        let body: serde_json::Value = Self::parse_response(response).await?;
        JobStatus::from_wire(body, handle).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_url_tolerates_trailing_slash() {
        let config = HttpConfig {
            base_url: "http://localhost:8080/".into(),
            ..Default::default()
        };
        let transport = HttpTransport::with_client(reqwest::Client::new(), &config).unwrap();
        assert_eq!(transport.jobs_url(), "http://localhost:8080/v1/ade/parse/jobs");
    }

    #[test]
    fn job_url_encodes_handle_as_one_segment() {
        let config = HttpConfig {
            base_url: "http://localhost:8080".into(),
            ..Default::default()
        };
        let transport = HttpTransport::with_client(reqwest::Client::new(), &config).unwrap();

        assert_eq!(
            transport.job_url(&JobHandle::new("job-1")).as_str(),
            "http://localhost:8080/v1/ade/parse/jobs/job-1"
        );
        assert_eq!(
            transport.job_url(&JobHandle::new("a/b?c#d")).as_str(),
            "http://localhost:8080/v1/ade/parse/jobs/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn invalid_base_url_is_a_builder_error() {
        let config = HttpConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        let err = HttpTransport::with_client(reqwest::Client::new(), &config).err();
        assert!(matches!(err, Some(TransportError::Builder(_))));
    }

    #[test]
    fn retry_after_accepts_seconds_and_http_dates() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(parse_retry_after(" 7 ", now), Some(Duration::from_secs(7)));
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:27:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn default_config_targets_production() {
        let config = HttpConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }
}

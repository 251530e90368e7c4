//! Shared test helpers: a scripted in-memory transport.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ade_core::request::JobRequest;
use ade_core::status::JobStatus;
use ade_core::types::JobHandle;
use ade_jobs::client::{ClientConfig, JobClient};
use ade_jobs::transport::{JobTransport, TransportError};
use async_trait::async_trait;

/// Transport that replays pre-recorded responses.
///
/// Submissions are answered from one queue. Status queries are answered
/// from a per-handle queue; once a handle's queue runs dry its last
/// successful status is repeated.
#[derive(Default)]
pub struct ScriptedTransport {
    submissions: Mutex<VecDeque<Result<JobHandle, TransportError>>>,
    statuses: Mutex<HashMap<JobHandle, VecDeque<Result<JobStatus, TransportError>>>>,
    last_status: Mutex<HashMap<JobHandle, JobStatus>>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_submit(self, response: Result<JobHandle, TransportError>) -> Self {
        self.submissions.lock().unwrap().push_back(response);
        self
    }

    pub fn on_status(self, handle: &str, response: Result<JobStatus, TransportError>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .entry(JobHandle::new(handle))
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a sequence of successful statuses for `handle`.
    pub fn with_statuses(self, handle: &str, statuses: Vec<JobStatus>) -> Self {
        statuses
            .into_iter()
            .fold(self, |t, status| t.on_status(handle, Ok(status)))
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobTransport for ScriptedTransport {
    async fn submit(&self, _request: &JobRequest) -> Result<JobHandle, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connection("submission script exhausted".into())))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatus, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let next = self
            .statuses
            .lock()
            .unwrap()
            .get_mut(handle)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Ok(status)) => {
                self.last_status
                    .lock()
                    .unwrap()
                    .insert(handle.clone(), status.clone());
                Ok(status)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last_status
                .lock()
                .unwrap()
                .get(handle)
                .cloned()
                .ok_or_else(|| TransportError::http(404, format!("unknown job {handle}"))),
        }
    }
}

pub fn handle(id: &str) -> JobHandle {
    JobHandle::new(id)
}

pub fn url_request() -> JobRequest {
    JobRequest::new()
        .model("dpt-2-latest")
        .document_url("https://example.com/document.pdf")
}

pub fn rate_limited() -> TransportError {
    TransportError::http(429, "rate limited")
}

/// Client over `transport` with the documented defaults.
pub fn job_client(transport: &Arc<ScriptedTransport>) -> JobClient {
    job_client_with(transport, ClientConfig::default())
}

pub fn job_client_with(transport: &Arc<ScriptedTransport>, config: ClientConfig) -> JobClient {
    JobClient::new(Arc::clone(transport) as Arc<dyn JobTransport>, config)
}

pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

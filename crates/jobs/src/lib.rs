//! Client for the ADE asynchronous parse-jobs workflow.
//!
//! Submits parse jobs, polls them to a terminal state, and retries
//! transient failures with exponential backoff. The HTTP transport wraps
//! the ADE REST endpoints; the [`transport::JobTransport`] trait lets
//! callers substitute their own.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod retry;
pub mod transport;

//! Domain types for the ADE parse-jobs client.
//!
//! Requests, handles, the job status state machine and backoff
//! arithmetic. Nothing in this crate performs I/O.

pub mod backoff;
pub mod error;
pub mod request;
pub mod status;
pub mod types;

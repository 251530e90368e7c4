//! Exponential-backoff retry of transient request failures.
//!
//! [`retry_transient`] re-runs a remote call while it fails with a
//! transient [`TransportError`], sleeping `base * 2^attempt` between
//! attempts. Fatal errors return immediately. Every wait respects the
//! [`CancellationToken`].

use std::future::Future;
use std::time::Duration;

use ade_core::backoff::{
    equal_jitter, exponential_delay, CONNECTION_BACKOFF_BASE, DEFAULT_MAX_BACKOFF,
    RATE_LIMIT_BACKOFF_BASE,
};
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::transport::TransportError;

/// Default number of attempts per call, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per call, including the first. Values below 1 are
    /// treated as 1.
    pub max_attempts: u32,
    /// Backoff base for rate-limited (429) responses.
    pub rate_limit_base: Duration,
    /// Backoff base for every other transient failure.
    pub connection_base: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Randomise each delay within `[d/2, d]`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_base: RATE_LIMIT_BACKOFF_BASE,
            connection_base: CONNECTION_BACKOFF_BASE,
            max_delay: DEFAULT_MAX_BACKOFF,
            jitter: false,
        }
    }
}

/// Delay to wait after `error` failed attempt number `attempt` (zero-based).
///
/// A `Retry-After` hint from the service raises the delay but never past
/// [`RetryConfig::max_delay`].
pub fn backoff_delay(error: &TransportError, attempt: u32, config: &RetryConfig) -> Duration {
    let base = if error.is_rate_limited() {
        config.rate_limit_base
    } else {
        config.connection_base
    };

    let mut delay = exponential_delay(base, attempt, config.max_delay);
    if config.jitter {
        delay = equal_jitter(delay, rand::random::<f64>());
    }

    match error.retry_after() {
        Some(hint) => delay.max(hint).min(config.max_delay),
        None => delay,
    }
}

/// Run `call` until it succeeds, fails fatally, or the attempt budget is
/// spent.
///
/// `on_retry` runs before each backoff sleep with the failed attempt's
/// index, the chosen delay and the error. Cancellation is checked before
/// every attempt and interrupts both in-flight calls and sleeps.
pub async fn retry_transient<T, F, Fut, R>(
    operation: &'static str,
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut on_retry: R,
    mut call: F,
) -> Result<T, JobError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
    R: FnMut(u32, Duration, &TransportError),
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::WaitCancelled),
            result = call() => result,
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => {
                tracing::warn!(operation, attempt, error = %e, "Request failed, not retrying");
                return Err(JobError::Fatal(e));
            }
            Err(e) => e,
        };

        if attempt + 1 >= max_attempts {
            tracing::warn!(
                operation,
                attempts = attempt + 1,
                error = %error,
                "Retry budget exhausted",
            );
            return Err(JobError::RetriesExhausted {
                attempts: attempt + 1,
                last: error,
            });
        }

        let delay = backoff_delay(&error, attempt, config);
        tracing::warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient failure, backing off",
        );
        on_retry(attempt, delay, &error);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(JobError::WaitCancelled),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}

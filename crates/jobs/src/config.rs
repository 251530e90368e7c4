use std::time::Duration;

use crate::client::ClientConfig;
use crate::http::HttpConfig;
use crate::retry::RetryConfig;

pub const ENV_API_KEY: &str = "VISION_AGENT_API_KEY";
pub const ENV_BASE_URL: &str = "ADE_BASE_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "ADE_POLL_INTERVAL_SECS";
pub const ENV_WAIT_TIMEOUT_SECS: &str = "ADE_WAIT_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "ADE_MAX_ATTEMPTS";
pub const ENV_RATE_LIMIT_BACKOFF_SECS: &str = "ADE_RATE_LIMIT_BACKOFF_SECS";
pub const ENV_CONNECTION_BACKOFF_SECS: &str = "ADE_CONNECTION_BACKOFF_SECS";
pub const ENV_MAX_BACKOFF_SECS: &str = "ADE_MAX_BACKOFF_SECS";
pub const ENV_BACKOFF_JITTER: &str = "ADE_BACKOFF_JITTER";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ADE_REQUEST_TIMEOUT_SECS";

/// Client configuration loaded from environment variables.
///
/// All fields have defaults matching the documented examples; override
/// via environment variables.
#[derive(Debug, Clone, Default)]
pub struct AdeConfig {
    pub http: HttpConfig,
    pub client: ClientConfig,
}

impl AdeConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                     |
    /// |-------------------------------|-----------------------------|
    /// | `VISION_AGENT_API_KEY`        | unset                       |
    /// | `ADE_BASE_URL`                | `https://api.va.landing.ai` |
    /// | `ADE_POLL_INTERVAL_SECS`      | `5`                         |
    /// | `ADE_WAIT_TIMEOUT_SECS`       | `1800`                      |
    /// | `ADE_MAX_ATTEMPTS`            | `3`                         |
    /// | `ADE_RATE_LIMIT_BACKOFF_SECS` | `10`                        |
    /// | `ADE_CONNECTION_BACKOFF_SECS` | `2`                         |
    /// | `ADE_MAX_BACKOFF_SECS`        | `60`                        |
    /// | `ADE_BACKOFF_JITTER`          | `false`                     |
    /// | `ADE_REQUEST_TIMEOUT_SECS`    | `60`                        |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let retry_defaults = &defaults.client.retry;

        let http = HttpConfig {
            base_url: non_empty(&lookup, ENV_BASE_URL).unwrap_or(defaults.http.base_url),
            api_key: non_empty(&lookup, ENV_API_KEY),
            request_timeout: secs(
                &lookup,
                ENV_REQUEST_TIMEOUT_SECS,
                defaults.http.request_timeout,
            ),
        };

        let retry = RetryConfig {
            max_attempts: parsed(&lookup, ENV_MAX_ATTEMPTS, retry_defaults.max_attempts),
            rate_limit_base: secs(
                &lookup,
                ENV_RATE_LIMIT_BACKOFF_SECS,
                retry_defaults.rate_limit_base,
            ),
            connection_base: secs(
                &lookup,
                ENV_CONNECTION_BACKOFF_SECS,
                retry_defaults.connection_base,
            ),
            max_delay: secs(&lookup, ENV_MAX_BACKOFF_SECS, retry_defaults.max_delay),
            jitter: parsed(&lookup, ENV_BACKOFF_JITTER, retry_defaults.jitter),
        };

        let client = ClientConfig {
            poll_interval: secs(&lookup, ENV_POLL_INTERVAL_SECS, defaults.client.poll_interval),
            wait_timeout: secs(&lookup, ENV_WAIT_TIMEOUT_SECS, defaults.client.wait_timeout),
            retry,
        };

        Self { http, client }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Debug,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, ?default, "Invalid value, using default");
            default
        }),
        None => default,
    }
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    Duration::from_secs(parsed(lookup, key, default.as_secs()))
}

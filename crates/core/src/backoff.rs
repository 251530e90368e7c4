//! Exponential backoff arithmetic.
//!
//! Pure functions only; sleeping and randomness live with the caller.

use std::time::Duration;

/// Documented backoff base for rate-limited (HTTP 429) requests.
pub const RATE_LIMIT_BACKOFF_BASE: Duration = Duration::from_secs(10);

/// Documented backoff base for connection errors and timeouts.
pub const CONNECTION_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Default ceiling applied to every backoff delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// `base * 2^attempt`, clamped to `max`.
///
/// `attempt` is zero-based, so the first retry waits exactly `base`.
/// Overflow saturates at `max`.
pub fn exponential_delay(base: Duration, attempt: u32, max: Duration) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(max, |delay| delay.min(max))
}

/// Equal jitter: keep half of `delay` and scale the other half by
/// `fraction`, which is clamped into `[0, 1]`.
///
/// The result always lies within `[delay / 2, delay]`.
pub fn equal_jitter(delay: Duration, fraction: f64) -> Duration {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let half = delay / 2;
    half + (delay - half).mul_f64(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_waits_base() {
        let d = exponential_delay(Duration::from_secs(10), 0, DEFAULT_MAX_BACKOFF);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn rate_limit_sequence_matches_documented_waits() {
        let waits: Vec<u64> = (0..3)
            .map(|a| exponential_delay(RATE_LIMIT_BACKOFF_BASE, a, Duration::MAX).as_secs())
            .collect();
        assert_eq!(waits, [10, 20, 40]);
    }

    #[test]
    fn full_backoff_sequence_clamps_at_max() {
        let expected = [2, 4, 8, 16, 32, 60, 60, 60];
        for (attempt, &secs) in expected.iter().enumerate() {
            let d = exponential_delay(CONNECTION_BACKOFF_BASE, attempt as u32, DEFAULT_MAX_BACKOFF);
            assert_eq!(d.as_secs(), secs, "attempt {attempt}");
        }
    }

    #[test]
    fn huge_attempt_saturates_instead_of_overflowing() {
        let d = exponential_delay(Duration::from_secs(1), 200, Duration::from_secs(30));
        assert_eq!(d, Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_half_and_full_delay() {
        let delay = Duration::from_secs(8);
        assert_eq!(equal_jitter(delay, 0.0), Duration::from_secs(4));
        assert_eq!(equal_jitter(delay, 1.0), delay);
        assert_eq!(equal_jitter(delay, 0.5), Duration::from_secs(6));
    }

    #[test]
    fn jitter_fraction_out_of_range_is_clamped() {
        let delay = Duration::from_secs(8);
        assert_eq!(equal_jitter(delay, 7.0), delay);
        assert_eq!(equal_jitter(delay, -1.0), Duration::from_secs(4));
        assert_eq!(equal_jitter(delay, f64::NAN), Duration::from_secs(4));
    }
}

//! Backoff policy for page fetches.

use std::time::Duration;

use rand::Rng;

/// Statuses worth another attempt: auth/proxy hiccups behind the CDN, rate limits, server errors.
pub const RETRYABLE_STATUSES: [u16; 7] = [403, 407, 429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per page, first try included. Never below 1.
    pub max_attempts: u32,
    /// Upper bound of the exponential part of the delay, before jitter.
    pub sleep_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, sleep_cap: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            sleep_cap,
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// `min(2^attempt, cap)` seconds, attempt 0-indexed.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = Duration::from_secs(2_u64.saturating_pow(attempt));
        exp.min(self.sleep_cap)
    }

    /// Base delay plus `jitter` seconds, `jitter` in `[0, 1)`.
    pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        self.base_delay(attempt) + Duration::from_secs_f64(jitter.clamp(0.0, 1.0))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter: f64 = rand::thread_rng().gen();
        self.delay_with_jitter(attempt, jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(6, Duration::from_secs(5));
        let delays: Vec<_> = (0..5).map(|a| policy.base_delay(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
        assert_eq!(policy.base_delay(200), Duration::from_secs(5));
    }

    #[test]
    fn test_delay_jitter_stays_below_one_second() {
        let policy = RetryPolicy::default();
        for attempt in 0..4 {
            let d = policy.delay(attempt);
            let base = policy.base_delay(attempt);
            assert!(d >= base);
            assert!(d < base + Duration::from_secs(1));
        }
    }

    #[test]
    fn test_retryable_statuses() {
        let policy = RetryPolicy::default();
        for status in [403, 407, 429, 500, 502, 503, 504] {
            assert!(policy.is_retryable_status(status));
        }
        for status in [200, 400, 401, 404, 422, 501] {
            assert!(!policy.is_retryable_status(status));
        }
    }
}

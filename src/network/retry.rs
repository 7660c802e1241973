//! Bounded retry budget with exponential backoff and jitter.

use std::time::Duration;

use rand::Rng;

use crate::error::GolosError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed before giving up
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn is_exhausted(&self, failures: u32) -> bool {
        failures >= self.max_attempts
    }

    pub fn should_retry(&self, error: &GolosError, failures: u32) -> bool {
        error.is_retryable() && !self.is_exhausted(failures)
    }

    /// Wait before the next attempt after `failures` consecutive failures.
    ///
    /// The first failure moves straight on to the next node. After that the delay
    /// doubles from `base_delay` up to `max_delay`, plus up to 10% jitter.
    pub fn delay(&self, failures: u32) -> Duration {
        if failures <= 1 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let exponential_base = 2u64.saturating_pow(failures - 2);
        let capped_delay = base_ms.saturating_mul(exponential_base).min(max_ms);

        let jitter_range = capped_delay / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped_delay + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(20, Duration::from_secs(2), Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_failure_has_no_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(1), Duration::ZERO);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(20, Duration::from_millis(100), Duration::from_millis(1000));
        let d2 = policy.delay(2).as_millis();
        let d3 = policy.delay(3).as_millis();
        assert!((100..110).contains(&d2));
        assert!((200..220).contains(&d3));

        let capped = policy.delay(30).as_millis();
        assert!((1000..1100).contains(&capped));
    }

    #[test]
    fn test_exhaustion() {
        let policy = RetryPolicy::immediate(3);
        let transport = GolosError::Transport("reset".to_string());
        assert!(policy.should_retry(&transport, 2));
        assert!(!policy.should_retry(&transport, 3));
        assert!(!policy.should_retry(&GolosError::ApiNotFound("x".to_string()), 0));
        assert_eq!(policy.delay(5), Duration::ZERO);
    }
}

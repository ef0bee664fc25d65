//! Retry configuration and the backoff envelope.

use rand::Rng;
use serde::{Deserialize, Serialize};
use shaper_common::{Result, ShaperError};
use std::time::Duration;
use tracing::error;

/// Retries granted after the first failure.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Wait before the first retry.
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_millis(10);

/// Upper bound for any single wait.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(50);

/// Configuration for exponential backoff between retries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Highest attempt number that is still retried
    ///
    /// Attempts are numbered from 0, so up to `max_attempts + 1` retries
    /// happen before the failure is rethrown.
    /// Default: 3
    pub max_attempts: u32,
    /// Wait before the first retry
    ///
    /// Default: 10ms
    pub min_wait: Duration,
    /// Cap for the exponential growth
    ///
    /// Default: 50ms
    pub max_wait: Duration,
    /// Spread waits randomly between consecutive backoff steps
    ///
    /// Default: true
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_wait: DEFAULT_MIN_WAIT,
            max_wait: DEFAULT_MAX_WAIT,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_min_wait(mut self, min_wait: Duration) -> Self {
        self.min_wait = min_wait;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Checks that the wait window is not inverted.
    pub fn validate(&self) -> Result<()> {
        if self.min_wait > self.max_wait {
            let err = ShaperError::InvalidRetryWindow {
                min: self.min_wait,
                max: self.max_wait,
            };
            error!("Invalid retry configuration: {}", err);
            return Err(err);
        }
        Ok(())
    }

    /// Deterministic wait for `attempt`: `min(max_wait, min_wait * 2^attempt)`.
    ///
    /// Saturates at `max_wait` instead of overflowing.
    pub fn backoff(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|factor| self.min_wait.checked_mul(factor))
            .map_or(self.max_wait, |wait| wait.min(self.max_wait))
    }

    /// Wait before retrying `attempt`, jittered with `rng`.
    ///
    /// With jitter the wait is drawn uniformly from
    /// `[backoff(attempt), backoff(attempt + 1)]`, so it stays within
    /// `[min_wait, max_wait]` and never shrinks from one attempt to the next.
    pub fn time_to_wait_with_rng<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let low = self.backoff(attempt);
        if !self.jitter {
            return low;
        }

        let high = self.backoff(attempt.saturating_add(1));
        if high <= low {
            return low;
        }
        rng.gen_range(low..=high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.min_wait, ms(10));
        assert_eq!(config.max_wait, ms(50));
        assert!(config.jitter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_config_builders() {
        let config = RetryConfig::new(5)
            .with_min_wait(ms(1))
            .with_max_wait(ms(8))
            .with_jitter(false);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.min_wait, ms(1));
        assert_eq!(config.max_wait, ms(8));
        assert!(!config.jitter);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let config = RetryConfig::default()
            .with_min_wait(ms(100))
            .with_max_wait(ms(10));
        assert_eq!(
            config.validate(),
            Err(ShaperError::InvalidRetryWindow {
                min: ms(100),
                max: ms(10)
            })
        );
    }

    #[test]
    fn test_equal_window_accepted() {
        let config = RetryConfig::default()
            .with_min_wait(ms(20))
            .with_max_wait(ms(20));
        assert!(config.validate().is_ok());
        assert_eq!(config.backoff(0), ms(20));
        assert_eq!(config.backoff(7), ms(20));
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(0), ms(10));
        assert_eq!(config.backoff(1), ms(20));
        assert_eq!(config.backoff(2), ms(40));
        assert_eq!(config.backoff(3), ms(50));
        assert_eq!(config.backoff(4), ms(50));
    }

    #[test]
    fn test_backoff_saturates_on_huge_attempts() {
        let config = RetryConfig::default();
        assert_eq!(config.backoff(31), ms(50));
        assert_eq!(config.backoff(32), ms(50));
        assert_eq!(config.backoff(u32::MAX), ms(50));
    }

    #[test]
    fn test_backoff_is_monotone() {
        let config = RetryConfig::default()
            .with_min_wait(ms(3))
            .with_max_wait(Duration::from_secs(10));
        let mut previous = Duration::ZERO;
        for attempt in 0..40 {
            let wait = config.backoff(attempt);
            assert!(wait >= previous, "attempt {}", attempt);
            previous = wait;
        }
        assert_eq!(previous, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_min_wait_never_waits() {
        let config = RetryConfig::default().with_min_wait(Duration::ZERO);
        let mut rng = StdRng::seed_from_u64(1);
        for attempt in 0..10 {
            assert_eq!(config.backoff(attempt), Duration::ZERO);
            assert_eq!(config.time_to_wait_with_rng(attempt, &mut rng), Duration::ZERO);
        }
    }

    #[test]
    fn test_time_to_wait_without_jitter() {
        let config = RetryConfig::default().with_jitter(false);
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 0..8 {
            assert_eq!(
                config.time_to_wait_with_rng(attempt, &mut rng),
                config.backoff(attempt)
            );
        }
    }

    #[test]
    fn test_jittered_wait_stays_between_steps() {
        let config = RetryConfig::default();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..1000 {
            let first = config.time_to_wait_with_rng(0, &mut rng);
            assert!(first >= ms(10) && first <= ms(20), "first {:?}", first);

            let second = config.time_to_wait_with_rng(1, &mut rng);
            assert!(second >= ms(20) && second <= ms(40), "second {:?}", second);

            let third = config.time_to_wait_with_rng(2, &mut rng);
            assert!(third >= ms(40) && third <= ms(50), "third {:?}", third);
        }
    }

    #[test]
    fn test_jittered_wait_saturates_at_max() {
        let config = RetryConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        for attempt in 3..64 {
            assert_eq!(config.time_to_wait_with_rng(attempt, &mut rng), ms(50));
        }
    }

    #[test]
    fn test_jitter_actually_varies() {
        let config = RetryConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let samples: Vec<_> = (0..50)
            .map(|_| config.time_to_wait_with_rng(0, &mut rng))
            .collect();
        assert!(samples.iter().any(|wait| *wait != samples[0]));
    }

    #[test]
    fn test_retry_config_serde() {
        let config = RetryConfig::new(2).with_jitter(false);
        let json = serde_json::to_string(&config).unwrap();
        let back: RetryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

//! Retry decisions with capped exponential backoff.
//!
//! The scheduler answers one question per failure: retry on the same host
//! after a wait, or give up. The wait is served inside [`RetryScheduler::decide`]
//! through the scheduler's clock, so a `RetrySame` decision means the caller
//! may re-issue the request right away.

use crate::config::RetryConfig;
use serde::{Deserialize, Serialize};
use shaper_common::{Clock, Result, TokioClock};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-issue the request on the same host. `waited` has already elapsed.
    RetrySame { waited: Duration },
    /// Give up and surface the original failure.
    Rethrow,
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::RetrySame { .. })
    }
}

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ReadTimeout,
    WriteTimeout,
    Unavailable,
    RequestError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ReadTimeout => "read timeout",
            FailureKind::WriteTimeout => "write timeout",
            FailureKind::Unavailable => "unavailable",
            FailureKind::RequestError => "request error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the driver reports about a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureContext {
    pub kind: FailureKind,
    /// Consistency level of the failed statement, if the driver knows it
    pub consistency: Option<String>,
    /// Zero-based number of retries already made for this request
    pub attempt: u32,
}

impl FailureContext {
    pub fn new(kind: FailureKind, attempt: u32) -> Self {
        Self {
            kind,
            consistency: None,
            attempt,
        }
    }

    pub fn with_consistency(mut self, consistency: impl Into<String>) -> Self {
        self.consistency = Some(consistency.into());
        self
    }
}

/// Exponential backoff retry policy.
///
/// Every failure category is treated alike: attempts up to
/// `max_attempts` are retried on the same host after
/// [`time_to_wait`](Self::time_to_wait), later ones are rethrown.
/// The scheduler holds no mutable state and can serve any number of
/// concurrent requests.
#[derive(Debug, Clone)]
pub struct RetryScheduler<C: Clock = TokioClock> {
    config: RetryConfig,
    clock: C,
}

impl RetryScheduler<TokioClock> {
    /// Creates a scheduler that waits on the tokio timer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRetryWindow` if `min_wait > max_wait`.
    pub fn new(config: RetryConfig) -> Result<Self> {
        Self::with_clock(config, TokioClock::new())
    }

    /// Fixed-count policy: retries immediately, at most `max_attempts + 1`
    /// times.
    pub fn without_backoff(max_attempts: u32) -> Self {
        Self {
            config: RetryConfig {
                max_attempts,
                min_wait: Duration::ZERO,
                max_wait: Duration::ZERO,
                jitter: false,
            },
            clock: TokioClock::new(),
        }
    }
}

impl<C: Clock> RetryScheduler<C> {
    pub fn with_clock(config: RetryConfig, clock: C) -> Result<Self> {
        config.validate()?;
        debug!(
            "Retry scheduler: max_attempts = {}, min_wait = {:?}, max_wait = {:?}, jitter = {}",
            config.max_attempts, config.min_wait, config.max_wait, config.jitter
        );
        Ok(Self { config, clock })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Deterministic envelope, see [`RetryConfig::backoff`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.config.backoff(attempt)
    }

    /// Wait that precedes retry number `attempt`.
    pub fn time_to_wait(&self, attempt: u32) -> Duration {
        self.config
            .time_to_wait_with_rng(attempt, &mut rand::thread_rng())
    }

    /// The wait for `attempt`, or `None` once retries are exhausted.
    ///
    /// Does not sleep.
    pub fn next_wait(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.config.max_attempts {
            None
        } else {
            Some(self.time_to_wait(attempt))
        }
    }

    /// Decides whether to retry `attempt`, serving the wait first.
    pub async fn decide(&self, attempt: u32) -> RetryDecision {
        match self.next_wait(attempt) {
            Some(wait) => {
                self.sleep(wait).await;
                RetryDecision::RetrySame { waited: wait }
            }
            None => RetryDecision::Rethrow,
        }
    }

    pub(crate) async fn sleep(&self, wait: Duration) {
        if !wait.is_zero() {
            self.clock.sleep(wait).await;
        }
    }

    /// Handles a failure of any category.
    pub async fn on_failure(&self, failure: &FailureContext) -> RetryDecision {
        let decision = self.decide(failure.attempt).await;
        let consistency = failure.consistency.as_deref().unwrap_or("unknown");

        match decision {
            RetryDecision::RetrySame { waited } => debug!(
                "Retrying after {} (consistency {}, attempt {}) on the same host, waited {:?}",
                failure.kind, consistency, failure.attempt, waited
            ),
            RetryDecision::Rethrow => warn!(
                "Giving up after {} (consistency {}): attempt {} exceeds max attempts {}",
                failure.kind, consistency, failure.attempt, self.config.max_attempts
            ),
        }
        decision
    }

    pub async fn on_read_timeout(&self, consistency: Option<&str>, attempt: u32) -> RetryDecision {
        self.notify(FailureKind::ReadTimeout, consistency, attempt)
            .await
    }

    pub async fn on_write_timeout(&self, consistency: Option<&str>, attempt: u32) -> RetryDecision {
        self.notify(FailureKind::WriteTimeout, consistency, attempt)
            .await
    }

    pub async fn on_unavailable(&self, consistency: Option<&str>, attempt: u32) -> RetryDecision {
        self.notify(FailureKind::Unavailable, consistency, attempt)
            .await
    }

    pub async fn on_request_error(&self, consistency: Option<&str>, attempt: u32) -> RetryDecision {
        self.notify(FailureKind::RequestError, consistency, attempt)
            .await
    }

    async fn notify(
        &self,
        kind: FailureKind,
        consistency: Option<&str>,
        attempt: u32,
    ) -> RetryDecision {
        let mut failure = FailureContext::new(kind, attempt);
        if let Some(consistency) = consistency {
            failure = failure.with_consistency(consistency);
        }
        self.on_failure(&failure).await
    }
}

//! Per-request retry bookkeeping and the `retry_with` adapter.

use crate::scheduler::{FailureContext, FailureKind, RetryDecision, RetryScheduler};
use shaper_common::Clock;
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Where a request stands in its retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// A failure arrived and is being judged
    Deciding,
    /// Sleeping before the next attempt
    Waiting,
    /// The wait is over and the request may be re-issued
    Retrying,
    /// Retries are exhausted; terminal
    Rethrown,
}

/// Tracks the attempts of one request against a shared scheduler.
///
/// The state stays at `Waiting` if the future returned by
/// [`record_failure`](Self::record_failure) is dropped during the wait.
#[derive(Debug)]
pub struct RetryTracker<'a, C: Clock> {
    scheduler: &'a RetryScheduler<C>,
    attempt: u32,
    state: Option<RetryState>,
}

impl<'a, C: Clock> RetryTracker<'a, C> {
    pub fn new(scheduler: &'a RetryScheduler<C>) -> Self {
        Self {
            scheduler,
            attempt: 0,
            state: None,
        }
    }

    /// Current state, `None` before the first failure.
    pub fn state(&self) -> Option<RetryState> {
        self.state
    }

    /// Retries granted so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == Some(RetryState::Rethrown)
    }

    /// Feeds one failure to the scheduler and advances the state.
    ///
    /// Once rethrown, every later failure is rethrown as well.
    pub async fn record_failure(
        &mut self,
        kind: FailureKind,
        consistency: Option<&str>,
    ) -> RetryDecision {
        if self.is_exhausted() {
            return RetryDecision::Rethrow;
        }

        self.state = Some(RetryState::Deciding);
        let mut failure = FailureContext::new(kind, self.attempt);
        if let Some(consistency) = consistency {
            failure = failure.with_consistency(consistency);
        }

        let consistency = failure.consistency.as_deref().unwrap_or("unknown");

        let Some(wait) = self.scheduler.next_wait(failure.attempt) else {
            self.state = Some(RetryState::Rethrown);
            warn!(
                "Giving up after {} (consistency {}): attempt {} exceeds max attempts {}",
                failure.kind,
                consistency,
                failure.attempt,
                self.scheduler.max_attempts()
            );
            return RetryDecision::Rethrow;
        };

        self.state = Some(RetryState::Waiting);
        self.scheduler.sleep(wait).await;

        self.state = Some(RetryState::Retrying);
        self.attempt += 1;
        debug!(
            "Retrying after {} (consistency {}, attempt {}) on the same host, waited {:?}",
            failure.kind, consistency, failure.attempt, wait
        );
        RetryDecision::RetrySame { waited: wait }
    }
}

/// Runs `operation` until it succeeds or the scheduler gives up.
///
/// Every error counts as [`FailureKind::RequestError`]. When retries run
/// out, the last error is returned exactly as the operation produced it.
pub async fn retry_with<C, F, Fut, T, E>(scheduler: &RetryScheduler<C>, operation: F) -> Result<T, E>
where
    C: Clock,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_classified(scheduler, operation, |_| Some(FailureKind::RequestError)).await
}

/// Like [`retry_with`], with a classifier for errors.
///
/// `classify` returns the failure category, or `None` for errors that must
/// not be retried at all.
pub async fn retry_classified<C, F, Fut, T, E, K>(
    scheduler: &RetryScheduler<C>,
    mut operation: F,
    classify: K,
) -> Result<T, E>
where
    C: Clock,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    K: Fn(&E) -> Option<FailureKind>,
{
    let mut tracker = RetryTracker::new(scheduler);

    loop {
        match operation().await {
            Ok(value) => {
                if tracker.attempt() > 0 {
                    debug!("Operation succeeded after {} retries", tracker.attempt());
                }
                return Ok(value);
            }
            Err(error) => {
                let Some(kind) = classify(&error) else {
                    debug!("Non-retryable error: {}", error);
                    return Err(error);
                };

                match tracker.record_failure(kind, None).await {
                    RetryDecision::RetrySame { .. } => {
                        debug!("Attempt failed with {}: {}", kind, error);
                    }
                    RetryDecision::Rethrow => {
                        warn!(
                            "Max attempts ({}) exceeded. Last error: {}",
                            scheduler.max_attempts(),
                            error
                        );
                        return Err(error);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use shaper_common::ManualClock;
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn scheduler(max_attempts: u32) -> (RetryScheduler<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let config = RetryConfig::new(max_attempts).with_jitter(false);
        (
            RetryScheduler::with_clock(config, clock.clone()).unwrap(),
            clock,
        )
    }

    #[tokio::test]
    async fn test_tracker_walks_states() {
        let (scheduler, clock) = scheduler(1);
        let mut tracker = RetryTracker::new(&scheduler);
        assert_eq!(tracker.state(), None);

        let decision = tracker.record_failure(FailureKind::ReadTimeout, Some("ONE")).await;
        assert!(decision.is_retry());
        assert_eq!(tracker.state(), Some(RetryState::Retrying));
        assert_eq!(tracker.attempt(), 1);

        tracker.record_failure(FailureKind::ReadTimeout, None).await;
        assert_eq!(tracker.attempt(), 2);
        assert_eq!(clock.now(), Duration::from_millis(30));

        let decision = tracker.record_failure(FailureKind::WriteTimeout, None).await;
        assert_eq!(decision, RetryDecision::Rethrow);
        assert_eq!(tracker.state(), Some(RetryState::Rethrown));
        assert!(tracker.is_exhausted());
    }

    #[tokio::test]
    async fn test_rethrown_is_terminal() {
        let (scheduler, clock) = scheduler(0);
        let mut tracker = RetryTracker::new(&scheduler);

        assert!(tracker.record_failure(FailureKind::Unavailable, None).await.is_retry());
        assert_eq!(
            tracker.record_failure(FailureKind::Unavailable, None).await,
            RetryDecision::Rethrow
        );
        let before = clock.now();
        assert_eq!(
            tracker.record_failure(FailureKind::Unavailable, None).await,
            RetryDecision::Rethrow
        );
        assert_eq!(tracker.attempt(), 1);
        assert_eq!(clock.now(), before);
    }

    #[tokio::test]
    async fn test_retry_with_eventually_succeeds() {
        let (scheduler, _clock) = scheduler(3);
        let mut calls = 0;

        let result: Result<u32, String> = retry_with(&scheduler, || {
            calls += 1;
            let current = calls;
            async move {
                if current < 3 {
                    Err(format!("failure {}", current))
                } else {
                    Ok(current)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_retry_classified_stops_on_fatal_error() {
        let (scheduler, clock) = scheduler(3);
        let mut calls = 0;

        let result: Result<(), &str> = retry_classified(
            &scheduler,
            || {
                calls += 1;
                async { Err("syntax error") }
            },
            |_| None,
        )
        .await;

        assert_eq!(result, Err("syntax error"));
        assert_eq!(calls, 1);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_tracker_logs_consistency() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (scheduler, _clock) = scheduler(0);
        let mut tracker = RetryTracker::new(&scheduler);
        tracker
            .record_failure(FailureKind::ReadTimeout, Some("LOCAL_QUORUM"))
            .await;
        tracker
            .record_failure(FailureKind::WriteTimeout, Some("LOCAL_ONE"))
            .await;

        let output = logs.contents();
        assert!(
            output.contains("read timeout (consistency LOCAL_QUORUM, attempt 0)"),
            "{}",
            output
        );
        assert!(
            output.contains("write timeout (consistency LOCAL_ONE): attempt 1"),
            "{}",
            output
        );
    }
}

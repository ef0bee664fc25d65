//! Retry scheduler integration tests on tokio's paused clock.

use shaper_retry::{
    retry_classified, retry_with, FailureKind, RetryConfig, RetryDecision, RetryScheduler,
};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, PartialEq)]
enum DriverError {
    ReadTimeout { attempt: u32 },
    Syntax,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::ReadTimeout { attempt } => write!(f, "read timeout on attempt {}", attempt),
            DriverError::Syntax => f.write_str("syntax error"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_surfaces_original_error() {
    let scheduler = RetryScheduler::new(RetryConfig::new(3).with_jitter(false)).unwrap();
    let calls = AtomicU32::new(0);
    let start = Instant::now();

    let result: Result<(), DriverError> = retry_with(&scheduler, || {
        let attempt = calls.fetch_add(1, Ordering::SeqCst);
        async move { Err(DriverError::ReadTimeout { attempt }) }
    })
    .await;

    // First call plus four retries (attempts 0..=3).
    assert_eq!(calls.load(Ordering::SeqCst), 5);
    assert_eq!(result, Err(DriverError::ReadTimeout { attempt: 4 }));
    // 10 + 20 + 40 + 50 ms of backoff.
    assert_eq!(start.elapsed(), Duration::from_millis(120));
}

#[tokio::test(start_paused = true)]
async fn test_jittered_total_wait_is_bounded() {
    let scheduler = RetryScheduler::new(RetryConfig::new(3)).unwrap();
    let start = Instant::now();

    let result: Result<(), DriverError> = retry_with(&scheduler, || async {
        Err(DriverError::ReadTimeout { attempt: 0 })
    })
    .await;

    assert!(result.is_err());
    let elapsed = start.elapsed();
    // Each wait sits between its own step and the next one.
    assert!(elapsed >= Duration::from_millis(120), "elapsed {:?}", elapsed);
    assert!(elapsed <= Duration::from_millis(200), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_classifier_skips_fatal_errors() {
    let scheduler = RetryScheduler::new(RetryConfig::default()).unwrap();
    let calls = AtomicU32::new(0);

    let result: Result<(), DriverError> = retry_classified(
        &scheduler,
        || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(DriverError::ReadTimeout { attempt })
                } else {
                    Err(DriverError::Syntax)
                }
            }
        },
        |error| match error {
            DriverError::ReadTimeout { .. } => Some(FailureKind::ReadTimeout),
            DriverError::Syntax => None,
        },
    )
    .await;

    assert_eq!(result, Err(DriverError::Syntax));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_decisions_share_one_scheduler() {
    let scheduler = Arc::new(RetryScheduler::new(RetryConfig::new(2).with_jitter(false)).unwrap());
    let start = Instant::now();

    let handles: Vec<_> = (0..16u32)
        .map(|i| {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.decide(i % 4).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let decision = handle.await.unwrap();
        match i % 4 {
            0 => assert_eq!(decision, RetryDecision::RetrySame { waited: Duration::from_millis(10) }),
            1 => assert_eq!(decision, RetryDecision::RetrySame { waited: Duration::from_millis(20) }),
            2 => assert_eq!(decision, RetryDecision::RetrySame { waited: Duration::from_millis(40) }),
            _ => assert_eq!(decision, RetryDecision::Rethrow),
        }
    }

    // Waits run side by side, not one after another.
    assert_eq!(start.elapsed(), Duration::from_millis(40));
}

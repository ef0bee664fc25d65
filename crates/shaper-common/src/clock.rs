//! Time source abstraction.
//!
//! The throttle and retry scheduler never read the system clock directly.
//! They go through a [`Clock`] so tests can run against virtual time:
//!
//! - [`TokioClock`] reads `tokio::time::Instant` and sleeps with
//!   `tokio::time::sleep`, so it also follows `tokio::time::pause()`.
//! - [`ManualClock`] never sleeps; a sleep simply advances its virtual time.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A monotonic time source that can also suspend the caller.
pub trait Clock: Send + Sync + 'static {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Suspends the calling task for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Clock backed by the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Deterministic clock for tests and simulations.
///
/// Clones share the same virtual time. `sleep` completes immediately after
/// moving the time forward, so concurrent sleepers each add their own wait.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves virtual time forward.
    pub fn advance(&self, duration: Duration) {
        self.micros
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }

    /// Jumps to `now`, which may lie before the current virtual time.
    ///
    /// Replays use this to start each request at its own arrival time.
    pub fn set(&self, now: Duration) {
        self.micros.store(now.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(500));
    }

    #[test]
    fn test_manual_clock_set_moves_both_ways() {
        let clock = ManualClock::new();
        clock.set(Duration::from_millis(40));
        assert_eq!(clock.now(), Duration::from_millis(40));
        clock.set(Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_shared_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.sleep(Duration::from_secs(3)).await;
        assert_eq!(other.now(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock::new();
        clock.sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.now(), Duration::from_secs(5));
    }
}

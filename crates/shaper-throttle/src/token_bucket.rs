//! Smooth token bucket.
//!
//! Permits are issued at a steady interval. A caller that asks for a permit
//! reserves the next free slot up front and then sleeps until that slot
//! arrives, so it never waits longer than it agreed to. Idle time is turned
//! into stored permits, capped at `burst_seconds * rate`, which are handed
//! out before fresh ones; a bucket with a zero burst window therefore never
//! bursts above its rate.
//!
//! All times are offsets from the owning clock's origin.

use std::time::Duration;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Token bucket state for one limiter.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Microseconds between two fresh permits
    stable_interval_micros: f64,
    /// Permits saved from idle periods
    stored_permits: f64,
    /// Upper bound for `stored_permits`
    max_permits: f64,
    /// Seconds of unused rate that may be saved
    burst_seconds: f64,
    /// Earliest time the next permit can be handed out
    next_free_micros: f64,
}

impl TokenBucket {
    /// Creates a bucket issuing `permits_per_second`, starting with no
    /// stored permits.
    pub fn new(permits_per_second: f64, burst_window: Duration, now: Duration) -> Self {
        let mut bucket = Self {
            stable_interval_micros: 0.0,
            stored_permits: 0.0,
            max_permits: 0.0,
            burst_seconds: burst_window.as_secs_f64(),
            next_free_micros: micros(now),
        };
        bucket.set_rate(permits_per_second, now);
        bucket
    }

    /// Creates a bucket that never accumulates permits.
    pub fn without_burst(permits_per_second: f64, now: Duration) -> Self {
        Self::new(permits_per_second, Duration::ZERO, now)
    }

    pub fn rate(&self) -> f64 {
        MICROS_PER_SECOND / self.stable_interval_micros
    }

    pub fn stored_permits(&self) -> f64 {
        self.stored_permits
    }

    pub fn max_permits(&self) -> f64 {
        self.max_permits
    }

    /// Changes the issue rate.
    ///
    /// Permits earned so far are credited at the old rate first; stored
    /// permits are then rescaled so the bucket stays equally full.
    /// Reservations already made keep their slots.
    pub fn set_rate(&mut self, permits_per_second: f64, now: Duration) {
        self.resync(micros(now));
        self.stable_interval_micros = MICROS_PER_SECOND / permits_per_second;

        let old_max = self.max_permits;
        self.max_permits = self.burst_seconds * permits_per_second;
        self.stored_permits = if old_max == 0.0 {
            0.0
        } else {
            self.stored_permits * self.max_permits / old_max
        };
    }

    /// Whether a permit can be granted within `timeout` of `now`.
    pub fn can_acquire(&self, now: Duration, timeout: Duration) -> bool {
        self.next_free_micros - micros(timeout) <= micros(now)
    }

    /// Reserves one permit if it becomes available within `timeout`.
    ///
    /// Returns how long the caller has to wait for the reserved permit, or
    /// `None` without touching the bucket when the permit is out of reach.
    pub fn try_reserve(&mut self, now: Duration, timeout: Duration) -> Option<Duration> {
        if !self.can_acquire(now, timeout) {
            return None;
        }
        Some(self.reserve(now))
    }

    /// Reserves one permit unconditionally and returns the wait for it.
    pub fn reserve(&mut self, now: Duration) -> Duration {
        let now_micros = micros(now);
        self.resync(now_micros);

        let moment = self.next_free_micros;
        let stored_spent = self.stored_permits.min(1.0);
        let fresh = 1.0 - stored_spent;

        self.next_free_micros += fresh * self.stable_interval_micros;
        self.stored_permits -= stored_spent;

        let wait = (moment - now_micros).max(0.0);
        Duration::from_micros(wait.ceil() as u64)
    }

    fn resync(&mut self, now_micros: f64) {
        if now_micros > self.next_free_micros {
            let earned = (now_micros - self.next_free_micros) / self.stable_interval_micros;
            self.stored_permits = (self.stored_permits + earned).min(self.max_permits);
            self.next_free_micros = now_micros;
        }
    }
}

fn micros(duration: Duration) -> f64 {
    duration.as_micros() as f64
}

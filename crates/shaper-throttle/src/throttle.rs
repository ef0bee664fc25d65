use shaper_common::{Clock, Result, ShaperError, TokioClock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ThrottleConfig;
use crate::token_bucket::TokenBucket;

/// Which limiter ran out of permits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The connection pool cannot carry more requests; add connections.
    Capacity,
    /// The configured sustained rate is exhausted; raise the rate.
    Rate,
}

/// A registration that timed out waiting for permits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Rejection {
    pub reason: RejectReason,
    pub message: String,
}

/// Result of [`AdmissionThrottle::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The request may be dispatched
    Admitted,
    /// The request must not be dispatched
    Rejected(Rejection),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Admitted => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    /// Converts into a `Result` so callers can `?` a rejection.
    pub fn into_result(self) -> std::result::Result<(), Rejection> {
        match self {
            Self::Admitted => Ok(()),
            Self::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Blocking admission control with two token buckets.
///
/// Every registration needs one permit from each limiter, in order:
///
/// 1. **Capacity limiter**: issues `connections × hosts × ceiling` permits
///    per second and never bursts. This is the most the connection pool
///    can physically carry.
/// 2. **Rate limiter**: issues the configured sustained rate and saves
///    unused permits for up to the burst window, so quiet periods can be
///    spent later in a burst.
///
/// Both acquisitions share the single register timeout: whatever the
/// capacity limiter used is no longer available to the rate limiter.
///
/// # Thread Safety
///
/// Each bucket sits behind its own `tokio::sync::Mutex`, held only while a
/// permit is reserved and never across a sleep. The throttle can be shared
/// through an `Arc` by any number of tasks. There is no FIFO guarantee
/// between concurrent registrants.
///
/// # Example
///
/// ```
/// use shaper_throttle::{AdmissionThrottle, ThrottleConfig};
/// use std::time::Duration;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let config = ThrottleConfig::new(500.0).with_register_timeout(Duration::from_millis(500));
/// let throttle = AdmissionThrottle::new(config, Duration::from_secs(2)).unwrap();
///
/// assert!(throttle.register().await.is_admitted());
/// # });
/// ```
pub struct AdmissionThrottle<C: Clock = TokioClock> {
    config: ThrottleConfig,
    derived_capacity: u64,
    capacity_limiter: Mutex<TokenBucket>,
    rate_limiter: Mutex<TokenBucket>,
    /// Last configured rate, stored as `f64` bits
    rate: AtomicU64,
    clock: C,
}

impl AdmissionThrottle<TokioClock> {
    /// Builds a throttle on the tokio timer.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found, see
    /// [`ThrottleConfig::validate`].
    pub fn new(config: ThrottleConfig, request_timeout: Duration) -> Result<Self> {
        Self::with_clock(config, request_timeout, TokioClock::new())
    }
}

impl<C: Clock> AdmissionThrottle<C> {
    /// Builds a throttle on an explicit clock.
    pub fn with_clock(config: ThrottleConfig, request_timeout: Duration, clock: C) -> Result<Self> {
        let derived_capacity = match config.validate(request_timeout) {
            Ok(capacity) => capacity,
            Err(e) => {
                log_config_error(&config, &e);
                return Err(e);
            }
        };

        info!(
            "Initializing throttler with max_requests_per_second = {} and register_timeout = {:?}",
            config.max_requests_per_second, config.register_timeout
        );
        info!(
            "Based on {} requests per second, the recommended number of connections per host for {} host(s) is {}, currently {}",
            config.max_requests_per_second,
            config.number_of_hosts,
            config.recommended_connections(),
            config.connections_per_host
        );

        let now = clock.now();
        let capacity_limiter = TokenBucket::without_burst(derived_capacity as f64, now);
        let rate_limiter =
            TokenBucket::new(config.max_requests_per_second, config.burst_window, now);

        Ok(Self {
            rate: AtomicU64::new(config.max_requests_per_second.to_bits()),
            derived_capacity,
            capacity_limiter: Mutex::new(capacity_limiter),
            rate_limiter: Mutex::new(rate_limiter),
            config,
            clock,
        })
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Requests per second the connection pool can carry.
    pub fn derived_capacity(&self) -> u64 {
        self.derived_capacity
    }

    /// The last configured sustained rate.
    pub fn rate(&self) -> f64 {
        f64::from_bits(self.rate.load(Ordering::Acquire))
    }

    /// Changes the sustained rate in place.
    ///
    /// Takes effect for the next reservation; slots already reserved keep
    /// their place. The capacity limiter is untouched.
    ///
    /// # Errors
    ///
    /// Rejects a non-positive rate, and a rate above the derived capacity.
    pub async fn set_rate(&self, rate: f64) -> Result<()> {
        if !(rate > 0.0) || !rate.is_finite() {
            return Err(ShaperError::InvalidRate(rate));
        }
        if rate > self.derived_capacity as f64 {
            return Err(ShaperError::InsufficientCapacity {
                rate,
                capacity: self.derived_capacity,
                hosts: self.config.number_of_hosts,
                connections: self.config.connections_per_host,
                recommended: crate::config::recommended_connections_with_ceiling(
                    rate,
                    self.config.number_of_hosts,
                    self.config.per_connection_ceiling,
                ),
            });
        }

        let mut limiter = self.rate_limiter.lock().await;
        limiter.set_rate(rate, self.clock.now());
        self.rate.store(rate.to_bits(), Ordering::Release);
        drop(limiter);

        info!("Throttler max requests per second changed to {}", rate);
        Ok(())
    }

    /// Waits for permission to dispatch one request.
    ///
    /// Suspends for at most the configured register timeout in total.
    pub async fn register(&self) -> Admission {
        self.register_within(self.config.register_timeout).await
    }

    /// Like [`register`](Self::register) with a smaller budget.
    ///
    /// Budgets above the configured register timeout are cut down to it.
    pub async fn register_within(&self, budget: Duration) -> Admission {
        let deadline = budget.min(self.config.register_timeout);
        let start = self.clock.now();

        if !self.acquire(&self.capacity_limiter, deadline).await {
            return Admission::Rejected(Rejection {
                reason: RejectReason::Capacity,
                message: format!(
                    "Timeout waiting for connection permits. Increase number of connections \
                     (current connections per host: {}, hosts: {}, register timeout: {}ms)",
                    self.config.connections_per_host,
                    self.config.number_of_hosts,
                    deadline.as_millis()
                ),
            });
        }

        let elapsed = self.clock.now().saturating_sub(start);
        let remaining = deadline.saturating_sub(elapsed);

        if !self.acquire(&self.rate_limiter, remaining).await {
            return Admission::Rejected(Rejection {
                reason: RejectReason::Rate,
                message: format!(
                    "Timeout waiting for rate permits. Increase maxRequestsPerSecond \
                     (current max requests/s: {}, register timeout: {}ms)",
                    self.rate(),
                    deadline.as_millis()
                ),
            });
        }

        Admission::Admitted
    }

    async fn acquire(&self, limiter: &Mutex<TokenBucket>, timeout: Duration) -> bool {
        let wait = {
            let mut bucket = limiter.lock().await;
            bucket.try_reserve(self.clock.now(), timeout)
        };

        match wait {
            Some(wait) => {
                if !wait.is_zero() {
                    self.clock.sleep(wait).await;
                }
                true
            }
            None => false,
        }
    }

    /// Notes a successful request. Does not affect the limiters.
    pub fn signal_success(&self) {
        debug!("Throttled request succeeded");
    }

    /// Notes a failed request. Does not affect the limiters.
    pub fn signal_error(&self, error: &dyn std::error::Error) {
        warn!("Throttled request failed: {}", error);
    }

    /// Notes a request that timed out. Does not affect the limiters.
    pub fn signal_timeout(&self) {
        warn!("Throttled request timed out");
    }
}

fn log_config_error(config: &ThrottleConfig, err: &ShaperError) {
    match err {
        ShaperError::InsufficientCapacity {
            rate,
            capacity,
            hosts,
            connections,
            ..
        } => warn!(
            "Cannot reach max requests per second of {}: {} host(s) with {} connection(s) each provide at most {} requests per second; increase connections per host",
            rate, hosts, connections, capacity
        ),
        other => error!(
            "Invalid throttler configuration (max_requests_per_second = {}, register_timeout = {:?}): {}",
            config.max_requests_per_second, config.register_timeout, other
        ),
    }
}

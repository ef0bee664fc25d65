//! Throttle configuration.
//!
//! All limits are fixed at construction. [`ThrottleConfig::validate`] runs
//! the same checks the throttle runs, in the same order, so callers can
//! vet a configuration without building anything.

use serde::{Deserialize, Serialize};
use shaper_common::{EndpointType, Result, ShaperError};
use std::time::Duration;

/// Sustained rate used when none is configured.
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: f64 = 1000.0;

/// Requests per second a single connection is trusted to carry.
///
/// The service accepts up to 3000 requests per connection per second;
/// 2000 leaves headroom for protocol overhead.
pub const REQUESTS_PER_CONNECTION_CEILING: u32 = 2000;

/// How long unused rate permits are kept for a later burst.
pub const BURST_CAPACITY: Duration = Duration::from_secs(120);

/// Matches the driver's default request timeout.
pub const DEFAULT_REGISTER_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for an [`AdmissionThrottle`](crate::AdmissionThrottle).
///
/// # Example
///
/// ```
/// use shaper_throttle::ThrottleConfig;
/// use shaper_common::EndpointType;
/// use std::time::Duration;
///
/// let config = ThrottleConfig::for_endpoint(EndpointType::Public)
///     .with_max_requests_per_second(20_000.0)
///     .with_connections_per_host(2)
///     .with_register_timeout(Duration::from_secs(1));
///
/// assert_eq!(config.number_of_hosts, 9);
/// assert_eq!(config.derived_capacity(), 36_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Sustained admission rate
    pub max_requests_per_second: f64,
    /// Longest a single registration may wait across both limiters
    pub register_timeout: Duration,
    /// Hosts the driver keeps connection pools to
    pub number_of_hosts: u32,
    /// Connections in each host's pool
    pub connections_per_host: u32,
    /// Requests per second one connection may carry
    pub per_connection_ceiling: u32,
    /// Window over which unused rate permits accumulate
    pub burst_window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::for_endpoint(EndpointType::default())
    }
}

impl ThrottleConfig {
    /// Creates a configuration for the given rate with default limits.
    pub fn new(max_requests_per_second: f64) -> Self {
        Self {
            max_requests_per_second,
            ..Self::default()
        }
    }

    /// Default configuration sized for the hosts an endpoint advertises.
    pub fn for_endpoint(endpoint: EndpointType) -> Self {
        Self {
            max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
            register_timeout: DEFAULT_REGISTER_TIMEOUT,
            number_of_hosts: endpoint.default_hosts(),
            connections_per_host: 1,
            per_connection_ceiling: REQUESTS_PER_CONNECTION_CEILING,
            burst_window: BURST_CAPACITY,
        }
    }

    pub fn with_max_requests_per_second(mut self, rate: f64) -> Self {
        self.max_requests_per_second = rate;
        self
    }

    pub fn with_register_timeout(mut self, timeout: Duration) -> Self {
        self.register_timeout = timeout;
        self
    }

    pub fn with_number_of_hosts(mut self, hosts: u32) -> Self {
        self.number_of_hosts = hosts;
        self
    }

    pub fn with_connections_per_host(mut self, connections: u32) -> Self {
        self.connections_per_host = connections;
        self
    }

    pub fn with_per_connection_ceiling(mut self, ceiling: u32) -> Self {
        self.per_connection_ceiling = ceiling;
        self
    }

    pub fn with_burst_window(mut self, window: Duration) -> Self {
        self.burst_window = window;
        self
    }

    /// Requests per second the connection pool can physically carry.
    ///
    /// Saturates at `u64::MAX`.
    pub fn derived_capacity(&self) -> u64 {
        (self.connections_per_host as u64)
            .saturating_mul(self.number_of_hosts as u64)
            .saturating_mul(self.per_connection_ceiling as u64)
    }

    /// Connections per host needed for the configured rate.
    pub fn recommended_connections(&self) -> u64 {
        recommended_connections_with_ceiling(
            self.max_requests_per_second,
            self.number_of_hosts,
            self.per_connection_ceiling,
        )
    }

    /// Checks the configuration against the request timeout.
    ///
    /// Returns the derived capacity on success. Checks run in this order and
    /// stop at the first failure:
    ///
    /// 1. the rate is positive
    /// 2. the register timeout is positive and within the request timeout
    /// 3. there is at least one host and one connection per host
    /// 4. the derived capacity covers the rate
    pub fn validate(&self, request_timeout: Duration) -> Result<u64> {
        let rate = self.max_requests_per_second;
        if !(rate > 0.0) || !rate.is_finite() {
            return Err(ShaperError::InvalidRate(rate));
        }

        if self.register_timeout.is_zero() {
            return Err(ShaperError::InvalidRegisterTimeout(self.register_timeout));
        }
        if self.register_timeout > request_timeout {
            return Err(ShaperError::RegisterTimeoutExceedsRequestTimeout {
                register: self.register_timeout,
                request: request_timeout,
            });
        }

        if self.number_of_hosts == 0 || self.connections_per_host == 0 {
            return Err(ShaperError::InvalidTopology {
                hosts: self.number_of_hosts,
                connections: self.connections_per_host,
            });
        }

        let capacity = self.derived_capacity();
        if (capacity as f64) < rate {
            return Err(ShaperError::InsufficientCapacity {
                rate,
                capacity,
                hosts: self.number_of_hosts,
                connections: self.connections_per_host,
                recommended: self.recommended_connections(),
            });
        }

        Ok(capacity)
    }
}

/// Connections per host needed to carry `max_rate` over `hosts` hosts at the
/// default per-connection ceiling.
///
/// Never recommends fewer than one connection.
///
/// ```
/// use shaper_throttle::recommended_connections;
///
/// assert_eq!(recommended_connections(3500.0, 9), 1);
/// assert_eq!(recommended_connections(40_000.0, 1), 20);
/// ```
pub fn recommended_connections(max_rate: f64, hosts: u32) -> u64 {
    recommended_connections_with_ceiling(max_rate, hosts, REQUESTS_PER_CONNECTION_CEILING)
}

/// [`recommended_connections`] with an explicit per-connection ceiling.
///
/// Zero hosts or a zero ceiling are treated as one.
pub fn recommended_connections_with_ceiling(max_rate: f64, hosts: u32, ceiling: u32) -> u64 {
    let per_connection_round = hosts.max(1) as f64 * ceiling.max(1) as f64;
    let needed = (max_rate / per_connection_round).ceil();
    if needed.is_nan() || needed < 1.0 {
        1
    } else {
        needed as u64
    }
}

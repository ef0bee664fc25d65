use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShaperError {
    #[error("max requests per second must be greater than zero, currently {0}")]
    InvalidRate(f64),

    #[error("register timeout must be greater than zero, currently {0:?}")]
    InvalidRegisterTimeout(Duration),

    #[error(
        "register timeout must be less than or equal to the request timeout, \
         register timeout: {register:?}, request timeout: {request:?}"
    )]
    RegisterTimeoutExceedsRequestTimeout { register: Duration, request: Duration },

    #[error("number of hosts and connections per host must be at least 1, got {hosts} host(s) and {connections} connection(s)")]
    InvalidTopology { hosts: u32, connections: u32 },

    #[error(
        "cannot reach {rate} requests per second: {hosts} host(s) with {connections} connection(s) each \
         provide at most {capacity} requests per second; increase connections per host to at least {recommended}"
    )]
    InsufficientCapacity {
        rate: f64,
        capacity: u64,
        hosts: u32,
        connections: u32,
        recommended: u64,
    },

    #[error("retry min wait {min:?} must not exceed max wait {max:?}")]
    InvalidRetryWindow { min: Duration, max: Duration },
}

impl ShaperError {
    /// Returns true for errors caused by the configured connection pool size.
    pub fn is_capacity_error(&self) -> bool {
        matches!(self, ShaperError::InsufficientCapacity { .. })
    }
}

pub type Result<T> = std::result::Result<T, ShaperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_error_message_mentions_recommendation() {
        let err = ShaperError::InsufficientCapacity {
            rate: 10000.0,
            capacity: 4000,
            hosts: 1,
            connections: 2,
            recommended: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("10000"));
        assert!(msg.contains("at least 5"));
        assert!(err.is_capacity_error());
    }

    #[test]
    fn test_timeout_error_shows_both_values() {
        let err = ShaperError::RegisterTimeoutExceedsRequestTimeout {
            register: Duration::from_secs(10),
            request: Duration::from_secs(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("10s"));
        assert!(msg.contains("2s"));
        assert!(!err.is_capacity_error());
    }
}

//! # Shaper Retry
//!
//! Bounded exponential backoff for requests against a service that balances
//! load on its own side. Failed requests are retried on the same host after
//! a capped, jittered wait:
//!
//! ```text
//! backoff(n)      = min(max_wait, min_wait * 2^n)
//! time_to_wait(n) ∈ [backoff(n), backoff(n + 1)]
//! ```
//!
//! Attempts beyond `max_attempts` are rethrown with the original error.
//!
//! ## Example
//!
//! ```no_run
//! use shaper_retry::{retry_with, RetryConfig, RetryScheduler};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = RetryScheduler::new(RetryConfig::default())?;
//! let rows = retry_with(&scheduler, || async { Ok::<_, std::io::Error>(42) }).await?;
//! assert_eq!(rows, 42);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod scheduler;
pub mod tracker;

pub use config::{RetryConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WAIT, DEFAULT_MIN_WAIT};
pub use scheduler::{FailureContext, FailureKind, RetryDecision, RetryScheduler};
pub use tracker::{retry_classified, retry_with, RetryState, RetryTracker};

// Copyright 2025 Shaper Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Shaper Admission Throttle
//!
//! Client-side admission control for a storage service that balances load
//! on its own side. A request is dispatched only after it obtained a permit
//! from two token buckets:
//!
//! - a **capacity** bucket sized from the connection pool
//!   (`connections per host × hosts × per-connection ceiling`), and
//! - a **rate** bucket at the configured sustained rate that saves unused
//!   permits for up to two minutes.
//!
//! Both waits share one register timeout, and configuration mistakes are
//! refused at construction instead of being clamped.
//!
//! ## Key Types
//!
//! - [`ThrottleConfig`] - limits and their validation
//! - [`AdmissionThrottle`] - the blocking dual-limiter
//! - [`TokenBucket`] - the smooth bucket both limiters use
//! - [`recommended_connections`] - sizing helper for operators

pub mod config;
pub mod throttle;
pub mod token_bucket;

pub use config::{
    recommended_connections, recommended_connections_with_ceiling, ThrottleConfig,
    BURST_CAPACITY, DEFAULT_MAX_REQUESTS_PER_SECOND, DEFAULT_REGISTER_TIMEOUT,
    REQUESTS_PER_CONNECTION_CEILING,
};
pub use throttle::{Admission, AdmissionThrottle, RejectReason, Rejection};
pub use token_bucket::TokenBucket;

//! Shaper Common Types
//!
//! Shared building blocks for the shaper traffic-shaping policies:
//!
//! - [`node`] - read-only node snapshots handed over by the topology provider
//! - [`error`] - configuration errors raised when a policy is constructed
//! - [`clock`] - time source used by the blocking policies (real or virtual)
//! - [`endpoint`] - endpoint kinds and their advertised host counts
//! - [`advisor`] - warnings for session settings that fight the policies
//!
//! The policies themselves live in `shaper-balancer`, `shaper-throttle`
//! and `shaper-retry`. They share nothing at runtime beyond these types.

pub mod advisor;
pub mod clock;
pub mod endpoint;
pub mod error;
pub mod node;

pub use clock::{Clock, ManualClock, TokioClock};
pub use endpoint::EndpointType;
pub use error::{Result, ShaperError};
pub use node::Node;

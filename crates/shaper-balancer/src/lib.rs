//! Randomized node ordering for the shaper policies.
//!
//! [`RandomNodeOrderer`] hands out a fresh, uniformly shuffled [`QueryPlan`]
//! per request so that load spreads evenly over the client's connection
//! pool. Server-side balancing takes care of the rest.
//!
//! # Example
//!
//! ```
//! use shaper_balancer::RandomNodeOrderer;
//! use shaper_common::Node;
//! use std::net::SocketAddr;
//!
//! let nodes: Vec<Node> = (1..=3)
//!     .map(|i| Node::new(format!("host{}", i), SocketAddr::from(([10, 0, 0, i], 9142)), "us-east-1"))
//!     .collect();
//!
//! let orderer = RandomNodeOrderer::new("us-east-1");
//! let plan = orderer.plan(&nodes);
//! assert_eq!(plan.len(), 3);
//! ```

pub mod orderer;
pub mod query_plan;
pub mod topology;

pub use orderer::{durstenfeld_shuffle, RandomNodeOrderer};
pub use query_plan::QueryPlan;
pub use topology::Topology;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// A storage service host as seen by the topology provider.
///
/// The policies only read `Node` snapshots; liveness and datacenter
/// membership are maintained by whoever owns the topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub host_id: String,
    pub endpoint: SocketAddr,
    pub datacenter: String,
    pub up: bool,
}

impl Node {
    /// Creates a live node.
    pub fn new(host_id: impl Into<String>, endpoint: SocketAddr, datacenter: impl Into<String>) -> Self {
        Self {
            host_id: host_id.into(),
            endpoint,
            datacenter: datacenter.into(),
            up: true,
        }
    }

    /// Marks the node as down.
    pub fn down(mut self) -> Self {
        self.up = false;
        self
    }

    pub fn is_up(&self) -> bool {
        self.up
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.host_id, self.endpoint, self.datacenter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_node_creation() {
        let node = Node::new("host-1", addr(9142), "us-east-1");
        assert_eq!(node.host_id, "host-1");
        assert_eq!(node.endpoint, addr(9142));
        assert_eq!(node.datacenter, "us-east-1");
        assert!(node.is_up());
    }

    #[test]
    fn test_node_down() {
        let node = Node::new("host-1", addr(9142), "us-east-1").down();
        assert!(!node.is_up());
    }

    #[test]
    fn test_node_display() {
        let node = Node::new("host-1", addr(9142), "us-east-1");
        assert_eq!(node.to_string(), "host-1@127.0.0.1:9142 (us-east-1)");
    }

    #[test]
    fn test_node_serializes_to_json() {
        let node = Node::new("host-1", addr(9142), "us-east-1");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["host_id"], "host-1");
        assert_eq!(value["endpoint"], "127.0.0.1:9142");
        assert_eq!(value["up"], true);
    }
}

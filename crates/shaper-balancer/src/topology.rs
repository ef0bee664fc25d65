use shaper_common::Node;

/// Point-in-time view of every node the driver knows about.
///
/// Owned by the caller; the orderer only asks it for the live nodes of the
/// local datacenter.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
}

impl Topology {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// All nodes, live or not.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Live nodes of one datacenter, in snapshot order.
    pub fn live_in(&self, datacenter: &str) -> Vec<Node> {
        self.nodes
            .iter()
            .filter(|n| n.is_up() && n.datacenter == datacenter)
            .cloned()
            .collect()
    }
}

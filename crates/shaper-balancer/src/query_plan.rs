use shaper_common::Node;
use std::collections::VecDeque;

/// Ordered candidate nodes for a single request.
///
/// A plan is built fresh for every request and drained exactly once by the
/// caller; nothing refills it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    nodes: VecDeque<Node>,
}

impl QueryPlan {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Next node without consuming it.
    pub fn peek(&self) -> Option<&Node> {
        self.nodes.front()
    }
}

impl From<Vec<Node>> for QueryPlan {
    fn from(nodes: Vec<Node>) -> Self {
        Self {
            nodes: VecDeque::from(nodes),
        }
    }
}

impl Iterator for QueryPlan {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        self.nodes.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.nodes.len(), Some(self.nodes.len()))
    }
}

impl ExactSizeIterator for QueryPlan {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn node(id: &str) -> Node {
        Node::new(id, SocketAddr::from(([10, 0, 0, 1], 9142)), "dc1")
    }

    #[test]
    fn test_empty_plan() {
        let mut plan = QueryPlan::empty();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
        assert_eq!(plan.next(), None);
    }

    #[test]
    fn test_plan_is_consumed_once() {
        let mut plan = QueryPlan::from(vec![node("a"), node("b")]);
        assert_eq!(plan.peek().map(|n| n.host_id.as_str()), Some("a"));
        assert_eq!(plan.len(), 2);

        let drained: Vec<String> = plan.by_ref().map(|n| n.host_id).collect();
        assert_eq!(drained, vec!["a", "b"]);
        assert!(plan.is_empty());
        assert_eq!(plan.next(), None);
    }
}

use rand::Rng;
use shaper_common::Node;
use tracing::{info, trace};

use crate::query_plan::QueryPlan;
use crate::topology::Topology;

/// Randomized node ordering for an evenly used connection pool.
///
/// The service balances requests across its handlers on its own, so the
/// client only has to spread requests over its connections. Every plan is
/// a fresh uniform permutation of the live local nodes; no token or latency
/// awareness is involved.
#[derive(Debug, Clone)]
pub struct RandomNodeOrderer {
    local_datacenter: String,
}

impl RandomNodeOrderer {
    /// Creates an orderer for the given locality group.
    pub fn new(local_datacenter: impl Into<String>) -> Self {
        Self {
            local_datacenter: local_datacenter.into(),
        }
    }

    pub fn local_datacenter(&self) -> &str {
        &self.local_datacenter
    }

    /// Logs how many nodes are visible when the session starts.
    pub fn init(&self, topology: &Topology) {
        info!(
            "Total number of nodes visible to driver: {} ({} live in {})",
            topology.node_count(),
            topology.live_in(&self.local_datacenter).len(),
            self.local_datacenter
        );
    }

    /// Builds a plan from the live nodes of the local datacenter.
    pub fn new_query_plan(&self, topology: &Topology) -> QueryPlan {
        let live = topology.live_in(&self.local_datacenter);
        self.plan(&live)
    }

    /// Returns a uniformly random ordering of `live_nodes`.
    ///
    /// An empty input yields an empty plan and a single node is returned as
    /// is. The input slice is never modified.
    pub fn plan(&self, live_nodes: &[Node]) -> QueryPlan {
        self.plan_with_rng(live_nodes, &mut rand::thread_rng())
    }

    /// Same as [`plan`](Self::plan) with an explicit random source.
    pub fn plan_with_rng<R: Rng + ?Sized>(&self, live_nodes: &[Node], rng: &mut R) -> QueryPlan {
        if live_nodes.is_empty() {
            trace!("Total local nodes is 0, returning empty query plan");
            return QueryPlan::empty();
        }

        let mut nodes = live_nodes.to_vec();
        if nodes.len() > 1 {
            durstenfeld_shuffle(&mut nodes, rng);
        }

        trace!(
            total = nodes.len(),
            first = %nodes[0],
            "query plan built"
        );

        QueryPlan::from(nodes)
    }
}

/// Fisher–Yates shuffle in Durstenfeld's in-place form, walking upwards.
///
/// For each index `i` below the last, a `j` is drawn uniformly from
/// `[i, len - 1]` and the two slots are swapped. Consumes exactly
/// `len - 1` draws for `len >= 2` and none otherwise.
pub fn durstenfeld_shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    shuffle_with(items, |low, high| rng.gen_range(low..=high));
}

fn shuffle_with<T>(items: &mut [T], mut draw: impl FnMut(usize, usize) -> usize) {
    let len = items.len();
    if len < 2 {
        return;
    }
    for i in 0..len - 1 {
        let j = draw(i, len - 1);
        items.swap(i, j);
    }
}

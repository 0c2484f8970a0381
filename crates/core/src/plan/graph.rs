use std::collections::HashMap;

use tracing::trace;

use super::{MergePolicy, Stage};
use crate::route::Route;

/// A pool appearing in at least one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub address: String,
    /// Denom the pool produces.
    pub denom: String,
    /// Denom the pool consumes, as first observed.
    pub offer_denom: String,
    /// Greatest hop position of this pool over all routes.
    pub max_stage: usize,
    next: Vec<usize>,
}

impl GraphNode {
    pub fn is_source(&self) -> bool {
        self.max_stage == 0
    }
}

/// Many sources, one sink. Nodes are keyed by pool address and kept in
/// first-seen order so scheduling is deterministic for a given input order.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
    policy: MergePolicy,
}

impl Graph {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            policy,
        }
    }

    pub fn from_routes<'a>(routes: impl IntoIterator<Item = &'a Route>, policy: MergePolicy) -> Self {
        let mut graph = Self::new(policy);
        for route in routes {
            graph.add_route(route);
        }
        graph
    }

    pub fn add_route(&mut self, route: &Route) {
        let mut prev = None;
        for (position, hop) in route.hops.iter().enumerate() {
            let idx = match self.index.get(&hop.pool) {
                Some(&idx) => {
                    let node = &mut self.nodes[idx];
                    node.max_stage = node.max_stage.max(position);
                    idx
                }
                None => {
                    let idx = self.nodes.len();
                    self.nodes.push(GraphNode {
                        address: hop.pool.clone(),
                        denom: hop.denom.clone(),
                        offer_denom: route.offer_denom(position).to_string(),
                        max_stage: position,
                        next: Vec::new(),
                    });
                    self.index.insert(hop.pool.clone(), idx);
                    idx
                }
            };

            if let Some(prev) = prev {
                self.link(prev, idx);
            }
            prev = Some(idx);
        }
    }

    fn link(&mut self, from: usize, to: usize) {
        let next = &mut self.nodes[from].next;
        match self.policy {
            MergePolicy::LastWins => {
                next.clear();
                next.push(to);
            }
            MergePolicy::PreserveAll => {
                if !next.contains(&to) {
                    next.push(to);
                }
            }
        }
    }

    pub fn node(&self, address: &str) -> Option<&GraphNode> {
        self.index.get(address).map(|&idx| &self.nodes[idx])
    }

    /// Addresses of the nodes reachable in one step from `address`.
    pub fn successors(&self, address: &str) -> Vec<&str> {
        self.index
            .get(address)
            .map(|&idx| {
                self.nodes[idx]
                    .next
                    .iter()
                    .map(|&n| self.nodes[n].address.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks from the sources towards the sink one stage at a time.
    ///
    /// A node reached before its `max_stage` is carried forward until every
    /// route feeding it has caught up, so converging inputs land in the same
    /// stage. Within a stage a pool appears once and a denom is consumed by at
    /// most one pool. A pool reached again in a later stage runs again to
    /// convert what its late predecessor produced. The result is reversed: the
    /// executing contract pops stages off the end.
    pub fn schedule(&self) -> Vec<Stage> {
        self.staged()
            .into_iter()
            .rev()
            .map(|(_, stage)| stage)
            .collect()
    }

    /// Non-empty stages in input-to-output order, tagged with their stage index.
    ///
    /// Each frontier entry carries the walk that reached it. An edge back
    /// into that walk is not followed, which ends cycles left by overwritten
    /// edges.
    fn staged(&self) -> Vec<(usize, Stage)> {
        let mut stages = Vec::new();
        let mut frontier: Vec<(usize, Vec<usize>)> = (0..self.nodes.len())
            .filter(|&idx| self.nodes[idx].is_source())
            .map(|idx| (idx, vec![idx]))
            .collect();
        let mut stage_idx = 0;

        while !frontier.is_empty() {
            let mut stage = Stage::default();
            let mut offered: Vec<&str> = Vec::new();
            let mut next = Vec::new();

            for (idx, walk) in frontier {
                let node = &self.nodes[idx];
                if node.max_stage > stage_idx {
                    next.push((idx, walk));
                    continue;
                }
                if stage.contains_pool(&node.address)
                    || offered.contains(&node.offer_denom.as_str())
                {
                    trace!(pool = %node.address, stage = stage_idx, "skipping duplicate");
                    continue;
                }

                offered.push(&node.offer_denom);
                stage.push(node.address.clone(), node.denom.clone());
                for &succ in &node.next {
                    if walk.contains(&succ) {
                        trace!(pool = %node.address, "not following edge back into its own walk");
                        continue;
                    }
                    let mut walk = walk.clone();
                    walk.push(succ);
                    next.push((succ, walk));
                }
            }

            // a stage whose whole frontier was carried or deduplicated has nothing to run
            if !stage.is_empty() {
                stages.push((stage_idx, stage));
            }
            frontier = next;
            stage_idx += 1;
        }

        stages
    }
}

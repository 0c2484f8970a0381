//! Multi-input execution plans built from independent single-input routes.

use serde::{Deserialize, Serialize};

use crate::{coin::Coin, route::Route};

mod composer;
mod graph;
mod signing;

pub use composer::Composer;
pub use graph::{Graph, GraphNode};
pub use signing::{
    AuthenticitySigner, Attestation, OracleSigner, PlanSignature, SignError, SignedPlan,
};

/// What happens to an edge when two routes share a pool but continue differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// One outgoing edge per pool; the last processed route's continuation wins.
    #[default]
    LastWins,
    /// Keep every distinct continuation, in first-seen order.
    PreserveAll,
}

/// Pools that execute together. Serialized as `[[address, denom], ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stage(Vec<(String, String)>);

impl Stage {
    pub fn push(&mut self, address: impl Into<String>, denom: impl Into<String>) {
        self.0.push((address.into(), denom.into()));
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn contains_pool(&self, address: &str) -> bool {
        self.0.iter().any(|(pool, _)| pool == address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<A: Into<String>, D: Into<String>> FromIterator<(A, D)> for Stage {
    fn from_iter<T: IntoIterator<Item = (A, D)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(address, denom)| (address.into(), denom.into()))
                .collect(),
        )
    }
}

/// Stages in consumption order plus the coins sent along with them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub stages: Vec<Stage>,
    pub funds: Vec<Coin>,
}

impl ExecutionPlan {
    /// Merges resolved routes into one plan. Coins with empty routes are left out.
    pub fn from_routes(resolved: Vec<(Route, Coin)>, policy: MergePolicy) -> Self {
        let mut graph = Graph::new(policy);
        let mut funds = Vec::new();

        for (route, coin) in resolved {
            if route.is_empty() {
                continue;
            }
            graph.add_route(&route);
            funds.push(coin);
        }

        let stages = graph.schedule();
        if stages.is_empty() {
            return Self::default();
        }
        Self { stages, funds }
    }

    /// Nothing to execute this cycle.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty() || self.funds.is_empty()
    }

    pub fn hop_count(&self) -> usize {
        self.stages.iter().map(Stage::len).sum()
    }
}

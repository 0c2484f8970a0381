//! Single-input routes and the external service that prices them.

use std::{
    collections::HashSet,
    fmt::{self, Display},
};

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod manta;
pub use manta::MantaSwap;

/// One swap step: `pool` consumes the previous denom and produces `denom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    pub pool: String,
    pub denom: String,
}

impl Hop {
    pub fn new(pool: impl Into<String>, denom: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            denom: denom.into(),
        }
    }
}

/// Ordered hops from `input` towards the sink. Empty when no path was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub input: String,
    pub hops: Vec<Hop>,
}

impl Route {
    pub fn new(input: impl Into<String>, hops: Vec<Hop>) -> Self {
        Self {
            input: input.into(),
            hops,
        }
    }

    pub fn empty(input: impl Into<String>) -> Self {
        Self::new(input, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// The denom the route ends in, if it has any hops.
    pub fn output(&self) -> Option<&str> {
        self.hops.last().map(|hop| hop.denom.as_str())
    }

    /// The denom consumed by the hop at `position`.
    pub fn offer_denom(&self, position: usize) -> &str {
        match position.checked_sub(1).and_then(|prev| self.hops.get(prev)) {
            Some(prev) => &prev.denom,
            None => &self.input,
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input)?;
        for hop in &self.hops {
            write!(f, " -({})-> {}", hop.pool, hop.denom)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no route from {input} to {output}")]
    NotFound { input: String, output: String },

    #[error("route provider rejected the request: {0}")]
    Rejected(String),

    #[error("route provider unavailable")]
    ProviderUnavailable(#[from] reqwest::Error),
}

/// Prices a single-input, single-output path. Implemented by [`MantaSwap`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn resolve_route(
        &self,
        input: &str,
        amount: &BigUint,
        output: &str,
        slippage: &str,
    ) -> Result<Route, RouteError>;

    /// Denoms the provider is willing to route.
    async fn list_swappable_denoms(&self) -> Result<HashSet<String>, RouteError>;
}

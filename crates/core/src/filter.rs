//! Decides which contract balances are worth routing this cycle.

use std::collections::{HashMap, HashSet};

use num_bigint::BigUint;
use tracing::debug;

use crate::{
    coin::Coin,
    config::{PolicyConfig, RouteOverride},
};

const DEFAULT_DECIMALS: u32 = 6;

/// 0.0001 of an 18-decimal token.
const MIN_AMOUNT_18_DECIMALS: u64 = 100_000_000_000_000;

/// 0.01 of a 6-decimal token.
const MIN_AMOUNT_DEFAULT: u64 = 10_000;

#[derive(Debug, Clone, Default)]
pub struct InputFilter {
    decimals: HashMap<String, u32>,
    min_overrides: HashMap<String, BigUint>,
    denylist: HashSet<String>,
    overrides: HashMap<String, RouteOverride>,
}

impl InputFilter {
    pub fn new(policy: &PolicyConfig) -> Self {
        Self {
            decimals: policy.decimals.clone(),
            min_overrides: policy.min_overrides.clone(),
            denylist: policy.denylist.clone(),
            overrides: policy.overrides.clone(),
        }
    }

    pub fn decimals(&self, denom: &str) -> u32 {
        self.decimals.get(denom).copied().unwrap_or(DEFAULT_DECIMALS)
    }

    /// Smallest balance of `denom` worth swapping.
    pub fn min_swap_amount(&self, denom: &str) -> BigUint {
        if let Some(min) = self.min_overrides.get(denom) {
            return min.clone();
        }
        match self.decimals(denom) {
            18 => BigUint::from(MIN_AMOUNT_18_DECIMALS),
            _ => BigUint::from(MIN_AMOUNT_DEFAULT),
        }
    }

    fn has_override(&self, denom: &str, contract: &str) -> bool {
        self.overrides
            .get(denom)
            .is_some_and(|over| over.applies_to(contract))
    }

    /// Keeps the balances of `contract` that should be routed into `target`,
    /// preserving input order.
    pub fn filter(
        &self,
        balances: &[Coin],
        contract: &str,
        target: &str,
        allowlist: Option<&HashSet<String>>,
    ) -> Vec<Coin> {
        balances
            .iter()
            .filter(|coin| {
                if let Some(allowlist) = allowlist {
                    let allowed = allowlist.contains(&coin.denom)
                        || self.has_override(&coin.denom, contract)
                        || coin.denom == target;
                    if !allowed {
                        debug!(denom = %coin.denom, "not routable, skipping");
                        return false;
                    }
                }

                let min = self.min_swap_amount(&coin.denom);
                if coin.amount < min {
                    debug!(denom = %coin.denom, amount = %coin.amount, %min, "below minimum, skipping");
                    return false;
                }

                if self.denylist.contains(&coin.denom) {
                    debug!(denom = %coin.denom, "denylisted, skipping");
                    return false;
                }

                coin.denom != target
            })
            .cloned()
            .collect()
    }
}

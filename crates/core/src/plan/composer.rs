use std::{collections::HashMap, sync::Arc};

use futures::future::join_all;
use tracing::{debug, error, instrument};

use super::{ExecutionPlan, MergePolicy};
use crate::{
    coin::Coin,
    config::{PolicyConfig, RouteOverride},
    route::{Hop, Route, RouteError, RouteProvider},
};

/// Resolves a route per input balance and merges them into one plan.
#[derive(Clone)]
pub struct Composer {
    provider: Arc<dyn RouteProvider>,
    overrides: HashMap<String, RouteOverride>,
    slippage: String,
    merge: MergePolicy,
}

impl Composer {
    pub fn new(provider: Arc<dyn RouteProvider>, policy: &PolicyConfig, slippage: impl Into<String>) -> Self {
        Self {
            provider,
            overrides: policy.overrides.clone(),
            slippage: slippage.into(),
            merge: policy.merge,
        }
    }

    /// Builds the plan converting `balances` into `target` for `contract`.
    ///
    /// Inputs without a route are left out of the plan; the remaining inputs
    /// are unaffected.
    #[instrument(name = "compose", skip(self, balances), fields(inputs = balances.len()))]
    pub async fn compose(&self, contract: &str, balances: &[Coin], target: &str) -> ExecutionPlan {
        let resolved = join_all(
            balances
                .iter()
                .map(|coin| self.resolve(contract, coin, target)),
        )
        .await;

        let plan = ExecutionPlan::from_routes(resolved, self.merge);
        debug!(
            stages = plan.stages.len(),
            hops = plan.hop_count(),
            funds = plan.funds.len(),
            "composed plan"
        );
        plan
    }

    /// Route for a single input, and the coin actually committed to it.
    async fn resolve(&self, contract: &str, coin: &Coin, target: &str) -> (Route, Coin) {
        if let Some(over) = self
            .overrides
            .get(&coin.denom)
            .filter(|over| over.applies_to(contract))
        {
            let amount = match &over.max_swap_amount {
                Some(max) => max.min(&coin.amount).clone(),
                None => coin.amount.clone(),
            };
            debug!(denom = %coin.denom, pool = %over.address, %amount, "using route override");
            let route = Route::new(&coin.denom, vec![Hop::new(&over.address, &over.output)]);
            return (route, Coin::new(&coin.denom, amount));
        }

        match self
            .provider
            .resolve_route(&coin.denom, &coin.amount, target, &self.slippage)
            .await
        {
            Ok(route) => (route, coin.clone()),
            Err(err @ RouteError::NotFound { .. }) => {
                debug!(denom = %coin.denom, %err, "no route");
                (Route::empty(&coin.denom), coin.clone())
            }
            Err(err) => {
                error!(denom = %coin.denom, error = ?err, "route lookup failed");
                (Route::empty(&coin.denom), coin.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;
    use crate::{plan::Stage, route::MockRouteProvider};

    fn coin(denom: &str, amount: u64) -> Coin {
        Coin::new(denom, amount)
    }

    fn stage(entries: &[(&str, &str)]) -> Stage {
        entries.iter().copied().collect()
    }

    fn composer(provider: MockRouteProvider, policy: &PolicyConfig) -> Composer {
        Composer::new(Arc::new(provider), policy, "0.01")
    }

    fn direct_routes() -> MockRouteProvider {
        let mut provider = MockRouteProvider::new();
        provider
            .expect_resolve_route()
            .returning(|input, _, output, _| {
                Ok(Route::new(input, vec![Hop::new(format!("pool-{input}"), output)]))
            });
        provider
    }

    #[tokio::test]
    async fn two_inputs_direct_to_target() {
        let composer = composer(direct_routes(), &PolicyConfig::default());
        let balances = [coin("A", 1_000_000), coin("B", 2_000_000)];

        let plan = composer.compose("unifier1", &balances, "C").await;

        assert_eq!(plan.stages, vec![stage(&[("pool-A", "C"), ("pool-B", "C")])]);
        assert_eq!(plan.funds, balances.to_vec());
    }

    #[tokio::test]
    async fn failed_input_is_excluded() {
        let mut provider = MockRouteProvider::new();
        provider
            .expect_resolve_route()
            .returning(|input, _, output, _| match input {
                "B" => Err(RouteError::Rejected("denom not found".into())),
                _ => Ok(Route::new(input, vec![Hop::new("pool-A", output)])),
            });
        let composer = composer(provider, &PolicyConfig::default());

        let plan = composer
            .compose("unifier1", &[coin("A", 1_000_000), coin("B", 5)], "C")
            .await;

        assert_eq!(plan.stages, vec![stage(&[("pool-A", "C")])]);
        assert_eq!(plan.funds, vec![coin("A", 1_000_000)]);
    }

    #[tokio::test]
    async fn no_routes_give_an_empty_plan() {
        let mut provider = MockRouteProvider::new();
        provider.expect_resolve_route().returning(|input, _, output, _| {
            Err(RouteError::NotFound {
                input: input.to_string(),
                output: output.to_string(),
            })
        });
        let composer = composer(provider, &PolicyConfig::default());

        let plan = composer.compose("unifier1", &[coin("A", 1_000_000)], "C").await;
        assert!(plan.is_empty());
        assert!(plan.funds.is_empty());
    }

    #[tokio::test]
    async fn override_skips_provider_and_clamps_amount() {
        let mut provider = MockRouteProvider::new();
        provider.expect_resolve_route().never();

        let mut policy = PolicyConfig::default();
        policy.overrides.insert(
            "uplnk".into(),
            RouteOverride {
                address: "pool-plnk".into(),
                output: "uusk".into(),
                max_swap_amount: Some(BigUint::from(1_000u64)),
                only_for: None,
            },
        );
        let composer = composer(provider, &policy);

        let plan = composer.compose("unifier1", &[coin("uplnk", 5_000)], "ukuji").await;

        assert_eq!(plan.stages, vec![stage(&[("pool-plnk", "uusk")])]);
        assert_eq!(plan.funds, vec![coin("uplnk", 1_000)]);
    }

    #[tokio::test]
    async fn override_for_another_contract_falls_back_to_provider() {
        let mut policy = PolicyConfig::default();
        policy.overrides.insert(
            "A".into(),
            RouteOverride {
                address: "pool-override".into(),
                output: "C".into(),
                max_swap_amount: None,
                only_for: Some("unifier2".into()),
            },
        );
        let composer = composer(direct_routes(), &policy);

        let plan = composer.compose("unifier1", &[coin("A", 1_000_000)], "C").await;
        assert_eq!(plan.stages, vec![stage(&[("pool-A", "C")])]);
    }

    #[tokio::test]
    async fn routes_converging_on_one_pool_share_its_stage() {
        let mut provider = MockRouteProvider::new();
        provider
            .expect_resolve_route()
            .returning(|input, _, output, _| match input {
                "A" => Ok(Route::new(input, vec![Hop::new("pa", "X"), Hop::new("px", output)])),
                _ => Ok(Route::new(input, vec![Hop::new("pb", "X"), Hop::new("px", output)])),
            });
        let composer = composer(provider, &PolicyConfig::default());

        let plan = composer
            .compose("unifier1", &[coin("A", 1_000_000), coin("B", 1_000_000)], "C")
            .await;

        assert_eq!(
            plan.stages,
            vec![stage(&[("px", "C")]), stage(&[("pa", "X"), ("pb", "X")])]
        );
    }

    #[tokio::test]
    async fn composing_twice_gives_the_same_plan() {
        let composer = composer(direct_routes(), &PolicyConfig::default());
        let balances = [coin("A", 1_000_000), coin("B", 2_000_000)];

        let first = composer.compose("unifier1", &balances, "C").await;
        let second = composer.compose("unifier1", &balances, "C").await;
        assert_eq!(first, second);
    }
}

//! One long-running task per managed contract.

use std::{
    collections::HashSet,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use color_eyre::eyre::{self, WrapErr as _, eyre};
use crank_core::{
    chain::{self, Broadcaster, ChainQuery, TxReceipt},
    config::{ConfigError, Contract},
    filter::InputFilter,
    msg::ExecuteMsg,
    plan::{AuthenticitySigner, Composer, ExecutionPlan, SignedPlan},
    route::RouteProvider,
};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub use builder::Builder;
mod builder;

/// Result of a single crank iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Submitted(TxReceipt),
    /// Nothing worth routing this cycle
    NothingToDo,
}

pub struct Worker {
    contract: Contract,
    job: Job,
    chain: Arc<dyn ChainQuery>,
    broadcaster: Arc<dyn Broadcaster>,
    shutdown_token: CancellationToken,
}

enum Job {
    Hub,
    Unifier(Unifier),
}

struct Unifier {
    target: String,
    filter: InputFilter,
    composer: Composer,
    routes: Arc<dyn RouteProvider>,
    signer: Option<Arc<dyn AuthenticitySigner>>,
    use_allowlist: bool,
}

impl Worker {
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// Cranks, then sleeps the contract's interval, until shutdown.
    ///
    /// A failed iteration is logged and retried on the next tick.
    #[instrument(
        name = "worker",
        skip_all,
        fields(contract.address = %self.contract.address, contract.kind = %self.contract.kind)
    )]
    pub async fn run(self) -> eyre::Result<()> {
        info!(
            account = self.contract.account,
            interval = %humantime::format_duration(self.contract.interval),
            "starting worker"
        );

        loop {
            select! {
                biased;

                () = self.shutdown_token.cancelled() => break,

                res = self.crank_once() => match res {
                    Ok(Outcome::Submitted(receipt)) => info!(tx_hash = %receipt.tx_hash, "cranked"),
                    Ok(Outcome::NothingToDo) => debug!("nothing to do"),
                    Err(e) => error!(error = ?e, "crank failed"),
                },
            }

            select! {
                biased;

                () = self.shutdown_token.cancelled() => break,

                () = tokio::time::sleep(self.contract.interval) => {}
            }
        }

        info!("worker received shutdown signal");
        Ok(())
    }

    /// Runs a single iteration: build the message and submit it.
    #[instrument(name = "crank", skip_all)]
    pub async fn crank_once(&self) -> eyre::Result<Outcome> {
        let msg = match &self.job {
            Job::Hub => ExecuteMsg::crank(),
            Job::Unifier(unifier) => {
                let plan = self.unifier_plan(unifier).await?;
                if plan.is_empty() {
                    return Ok(Outcome::NothingToDo);
                }

                let signer = unifier
                    .signer
                    .as_deref()
                    .ok_or_else(|| ConfigError::Missing("oracle_key".into()))?;
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .wrap_err("system clock is before the unix epoch")?
                    .as_secs();
                let signed = SignedPlan::sign(plan, timestamp, signer)
                    .await
                    .wrap_err("failed to sign plan")?;
                ExecuteMsg::unify(signed)
            }
        };

        let receipt = self
            .broadcaster
            .submit(self.contract.account, &self.contract.address, &msg, &[])
            .await
            .wrap_err("failed to submit crank")?;
        Ok(Outcome::Submitted(receipt))
    }

    /// The plan a unifier would submit right now. Nothing is signed or sent.
    pub async fn plan(&self) -> eyre::Result<ExecutionPlan> {
        match &self.job {
            Job::Hub => Err(eyre!("{} does not take a plan", self.contract)),
            Job::Unifier(unifier) => self.unifier_plan(unifier).await,
        }
    }

    async fn unifier_plan(&self, unifier: &Unifier) -> eyre::Result<ExecutionPlan> {
        let address = &self.contract.address;

        let allowlist = if unifier.use_allowlist {
            match unifier.routes.list_swappable_denoms().await {
                Ok(denoms) => Some(denoms),
                Err(e) => {
                    warn!(error = %e, "failed to fetch allowlist, routing overrides only");
                    Some(HashSet::new())
                }
            }
        } else {
            None
        };

        let balances = chain::pending_swaps(self.chain.as_ref(), address)
            .await
            .wrap_err("failed to query pending swaps")?;

        let inputs = unifier
            .filter
            .filter(&balances, address, &unifier.target, allowlist.as_ref());
        if inputs.is_empty() {
            debug!(balances = balances.len(), "no balances to unify");
            return Ok(ExecutionPlan::default());
        }

        Ok(unifier.composer.compose(address, &inputs, &unifier.target).await)
    }
}

use std::sync::Arc;

use color_eyre::eyre;
use crank_core::{
    chain::{Broadcaster, ChainQuery},
    config::{Contract, ContractKind, PolicyConfig},
    filter::InputFilter,
    plan::{AuthenticitySigner, Composer},
    route::RouteProvider,
};
use tokio_util::sync::CancellationToken;

use super::{Job, Unifier, Worker};

pub struct Builder {
    pub contract: Contract,
    pub policy: PolicyConfig,
    pub slippage: String,
    pub chain: Arc<dyn ChainQuery>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub routes: Arc<dyn RouteProvider>,
    /// Unifiers cannot submit without one
    pub signer: Option<Arc<dyn AuthenticitySigner>>,
}

impl Builder {
    pub fn build(self, shutdown_token: CancellationToken) -> eyre::Result<Worker> {
        let Self {
            contract,
            policy,
            slippage,
            chain,
            broadcaster,
            routes,
            signer,
        } = self;

        let job = match &contract.kind {
            ContractKind::Hub => Job::Hub,
            ContractKind::Unifier { target } => {
                Job::Unifier(Unifier {
                    target: target.clone(),
                    filter: InputFilter::new(&policy),
                    composer: Composer::new(routes.clone(), &policy, slippage),
                    routes,
                    signer,
                    use_allowlist: policy.use_allowlist,
                })
            }
        };

        Ok(Worker {
            contract,
            job,
            chain,
            broadcaster,
            shutdown_token,
        })
    }
}

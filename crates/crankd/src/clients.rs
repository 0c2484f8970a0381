use std::{sync::Arc, time::Duration};

use color_eyre::eyre::{self, WrapErr as _};
use crank_core::{
    chain::{Broadcaster, ChainQuery, RestQuery, SignerRelay},
    config::{Config, ConfigError, Contract, ContractKind},
    plan::{AuthenticitySigner, OracleSigner},
    route::{MantaSwap, RouteProvider},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::worker::{self, Worker};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Collaborators shared by every worker.
#[derive(Clone)]
pub struct Clients {
    pub chain: Arc<dyn ChainQuery>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub routes: Arc<dyn RouteProvider>,
    pub signer: Option<Arc<dyn AuthenticitySigner>>,
}

impl Clients {
    /// Builds the http clients and loads the oracle key when one is configured.
    ///
    /// # Errors
    /// Returns an error if the oracle key is malformed.
    pub fn from_config(cfg: &Config) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .wrap_err("failed to build http client")?;

        let signer = match &cfg.oracle_key {
            Some(key) => {
                let signer =
                    OracleSigner::from_hex(key.expose()).wrap_err("failed to load oracle key")?;
                info!(?signer, "loaded oracle key");
                Some(Arc::new(signer) as Arc<dyn AuthenticitySigner>)
            }
            None => None,
        };

        let route_provider_url = cfg.route_provider_url();
        info!(url = %route_provider_url, "using route provider");

        Ok(Self {
            chain: Arc::new(RestQuery::new(http.clone(), &cfg.chain.rest_url)),
            broadcaster: Arc::new(SignerRelay::new(http.clone(), &cfg.chain.signer_url)),
            routes: Arc::new(MantaSwap::new(http, route_provider_url)),
            signer,
        })
    }

    /// Unifiers sign every plan, so running one without a key is a
    /// configuration error.
    pub fn ensure_signer(&self, contracts: &[Contract]) -> Result<(), ConfigError> {
        let has_unifier = contracts
            .iter()
            .any(|c| matches!(c.kind, ContractKind::Unifier { .. }));
        if has_unifier && self.signer.is_none() {
            return Err(ConfigError::Missing("oracle_key".into()));
        }
        Ok(())
    }

    pub fn worker(
        &self,
        cfg: &Config,
        contract: Contract,
        shutdown_token: CancellationToken,
    ) -> eyre::Result<Worker> {
        worker::Builder {
            contract,
            policy: cfg.policy.clone(),
            slippage: cfg.route_provider.slippage.clone(),
            chain: self.chain.clone(),
            broadcaster: self.broadcaster.clone(),
            routes: self.routes.clone(),
            signer: self.signer.clone(),
        }
        .build(shutdown_token)
    }
}

use color_eyre::eyre::{self, WrapErr as _};
use crank_core::config::Config;
use crankd::Clients;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(clap::Args, Debug)]
pub(crate) struct Plan {
    /// Unifier contract address
    #[arg(long)]
    pub(crate) contract: String,
}

impl Plan {
    pub(crate) async fn run(&self, config: &Config, shutdown_token: CancellationToken) -> eyre::Result<()> {
        let contract = config.contract(&self.contract)?;
        let clients = Clients::from_config(config)?;
        let worker = clients.worker(config, contract, shutdown_token)?;

        let plan = worker.plan().await?;
        info!(
            contract = %worker.contract(),
            stages = plan.stages.len(),
            hops = plan.hop_count(),
            "composed plan"
        );

        let json = serde_json::to_string_pretty(&plan).wrap_err("failed to encode plan")?;
        println!("{json}");
        Ok(())
    }
}

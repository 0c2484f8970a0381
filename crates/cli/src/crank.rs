use color_eyre::eyre;
use crank_core::config::Config;
use crankd::{Clients, worker::Outcome};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(clap::Args, Debug)]
pub(crate) struct Crank {
    /// Contract address
    #[arg(long)]
    contract: String,
}

impl Crank {
    pub(crate) async fn run(&self, config: &Config, shutdown_token: CancellationToken) -> eyre::Result<()> {
        let contract = config.contract(&self.contract)?;
        let clients = Clients::from_config(config)?;
        clients.ensure_signer(std::slice::from_ref(&contract))?;
        let worker = clients.worker(config, contract, shutdown_token)?;

        match worker.crank_once().await? {
            Outcome::Submitted(receipt) => {
                info!(contract = %worker.contract(), tx_hash = %receipt.tx_hash, "cranked");
                println!("{}", receipt.tx_hash);
            }
            Outcome::NothingToDo => info!(contract = %worker.contract(), "nothing to do"),
        }
        Ok(())
    }
}

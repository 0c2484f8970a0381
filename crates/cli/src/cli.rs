use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, WrapErr as _};
use crank_core::config::{Config, DEFAULT_CONFIG_PATH};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{contracts::Contracts, crank::Crank, plan::Plan};

#[derive(Parser, Debug)]
#[command(name = "crank", about = "Operate managed hub and unifier contracts")]
pub(crate) struct Cli {
    /// Configuration file, merged with `CRANK_` environment variables
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the registered contracts for the configured network
    Contracts(Contracts),

    /// Dry run: print the plan a unifier would submit now
    Plan(Plan),

    /// Run a single crank iteration against one contract
    Crank(Crank),
}

impl Cli {
    pub(crate) async fn run(self, shutdown_token: CancellationToken) -> eyre::Result<()> {
        let config = Config::load(&self.config)
            .wrap_err_with(|| format!("failed to load {}", self.config.display()))?;
        info!(network = %config.network, "loaded config");

        match self.command {
            Commands::Contracts(cmd) => cmd.run(&config),
            Commands::Plan(cmd) => cmd.run(&config, shutdown_token).await,
            Commands::Crank(cmd) => cmd.run(&config, shutdown_token).await,
        }
    }
}

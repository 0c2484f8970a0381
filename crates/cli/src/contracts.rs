use color_eyre::eyre::{self, WrapErr as _};
use crank_core::config::{Config, ContractKind};

#[derive(clap::Args, Debug)]
pub(crate) struct Contracts {
    /// Only show contracts the daemon would run
    #[arg(long)]
    enabled: bool,
}

impl Contracts {
    pub(crate) fn run(&self, config: &Config) -> eyre::Result<()> {
        let contracts = if self.enabled {
            config.contracts()
        } else {
            config.all_contracts()
        }
        .wrap_err("failed to resolve registry")?;

        println!("{:<8} {:<9} {:<12} {:<10} address", "account", "kind", "interval", "target");
        for contract in contracts {
            let target = match &contract.kind {
                ContractKind::Unifier { target } => target.as_str(),
                ContractKind::Hub => "-",
            };
            println!(
                "{:<8} {:<9} {:<12} {:<10} {}",
                contract.account,
                contract.kind.name(),
                humantime::format_duration(contract.interval).to_string(),
                target,
                contract.address,
            );
        }
        Ok(())
    }
}

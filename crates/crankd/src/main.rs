use std::process::ExitCode;

use color_eyre::eyre::{self, eyre};
use crank_core::config::{Config, DEFAULT_CONFIG_PATH};
use crankd::{
    Crankd,
    telemetry::{self, init_subscriber},
};
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};
use tracing::{error, info, instrument, warn};

/// Overrides the config file location.
const CONFIG_PATH_VAR: &str = "CRANKD_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("failed to install error hooks: {err:?}");
        return ExitCode::FAILURE;
    }

    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = match Config::load(&path) {
        Err(err) => {
            eprintln!("failed to read config from {path}:\n{err}");
            return ExitCode::FAILURE;
        }
        Ok(cfg) => cfg,
    };

    init_subscriber(telemetry::get_subscriber());
    info!(%path, network = %cfg.network, "loaded config");

    let mut crankd = match Crankd::spawn(cfg) {
        Ok(crankd) => crankd,
        Err(e) => {
            error!(error = ?e, "failed initializing crankd");
            return ExitCode::FAILURE;
        }
    };
    info!(contracts = ?crankd.contracts(), "cranking");

    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting sigterm listener on unix should always work");
    let mut sigint = signal(SignalKind::interrupt())
        .expect("setting sigint listener on unix should always work");

    let exit_reason = select! {
        _ = sigterm.recv() => Ok("received SIGTERM"),
        _ = sigint.recv() => Ok("received SIGINT"),
        res = &mut crankd => {
            res.and_then(|()| Err(eyre!("crankd service exited")))
        },
    };

    shutdown(exit_reason, crankd).await
}

#[instrument(skip_all)]
async fn shutdown(reason: eyre::Result<&str>, service: Crankd) -> ExitCode {
    let exit_code = match reason {
        Ok(reason) => {
            info!(reason, "shutting down");
            if let Err(e) = service.shutdown().await {
                warn!(error = ?e, "shutting down");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "crankd service exited unexpectedly");
            ExitCode::FAILURE
        }
    };
    info!("shutdown complete");
    exit_code
}

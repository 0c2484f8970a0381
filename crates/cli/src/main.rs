use std::process::ExitCode;

use clap::Parser as _;
use cli::Cli;
use crankd::telemetry::{get_subscriber, init_subscriber};
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod cli;
mod contracts;
mod crank;
mod plan;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("failed to install error hooks: {err:?}");
        return ExitCode::FAILURE;
    }
    init_subscriber(get_subscriber());

    let cli = Cli::parse();
    let shutdown_token = CancellationToken::new();
    let command = tokio::spawn(cli.run(shutdown_token.clone()));

    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting sigterm listener on unix should always work");
    let mut sigint = signal(SignalKind::interrupt())
        .expect("setting sigint listener on unix should always work");

    select! {
        res = command => match res {
            Ok(Ok(())) => ExitCode::SUCCESS,
            Ok(Err(e)) => {
                error!(error = ?e, "command failed");
                ExitCode::FAILURE
            }
            Err(e) => {
                error!(error = %e, "command panicked");
                ExitCode::FAILURE
            }
        },
        _ = sigterm.recv() => {
            info!("received SIGTERM signal");
            shutdown_token.cancel();
            ExitCode::FAILURE
        }
        _ = sigint.recv() => {
            info!("received SIGINT signal");
            shutdown_token.cancel();
            ExitCode::FAILURE
        }
    }
}

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use color_eyre::eyre::{self, WrapErr as _, eyre};
use crank_core::config::Config;
use tokio::{
    select,
    task::{JoinError, JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::clients::Clients;

/// Handle to the running daemon. Resolves when the supervisor stops, which
/// only happens on shutdown or once every worker has exited.
pub struct Crankd {
    shutdown_token: CancellationToken,
    contracts: Vec<String>,
    supervisor: JoinHandle<eyre::Result<()>>,
}

impl Crankd {
    /// Resolves the enabled contracts and spawns one supervised worker each.
    ///
    /// # Errors
    /// Returns an error if the registry cannot be resolved, nothing is
    /// enabled, a unifier has no oracle key, or a worker cannot be built.
    pub fn spawn(cfg: Config) -> eyre::Result<Self> {
        let contracts = cfg
            .contracts()
            .wrap_err_with(|| format!("failed to resolve contracts for {}", cfg.network))?;
        if contracts.is_empty() {
            return Err(eyre!("no contracts registered for {}", cfg.network));
        }

        let clients = Clients::from_config(&cfg)?;
        clients
            .ensure_signer(&contracts)
            .wrap_err("cannot run unifiers")?;

        let shutdown_token = CancellationToken::new();
        let mut supervisor = Supervisor::new(shutdown_token.child_token(), cfg.shutdown_grace);
        let mut names = Vec::with_capacity(contracts.len());
        for contract in contracts {
            let name = contract.to_string();
            let worker = clients
                .worker(&cfg, contract, supervisor.worker_token())
                .wrap_err_with(|| format!("failed to build worker for {name}"))?;
            supervisor.supervise(name.clone(), worker.run());
            names.push(name);
        }

        Ok(Self {
            shutdown_token,
            contracts: names,
            supervisor: tokio::spawn(supervisor.run()),
        })
    }

    /// Contracts with a running worker, in registry order.
    pub fn contracts(&self) -> &[String] {
        &self.contracts
    }

    /// Cancels every worker and waits for the supervisor to drain them.
    ///
    /// # Errors
    /// Returns an error if the supervisor failed or panicked.
    pub async fn shutdown(self) -> eyre::Result<()> {
        self.shutdown_token.cancel();
        supervisor_result(self.supervisor.await)
    }
}

impl Future for Crankd {
    type Output = eyre::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        use futures::future::FutureExt as _;

        self.supervisor.poll_unpin(cx).map(supervisor_result)
    }
}

fn supervisor_result(res: Result<eyre::Result<()>, JoinError>) -> eyre::Result<()> {
    match res {
        Ok(res) => res.wrap_err("worker supervisor stopped"),
        Err(e) => Err(e).wrap_err("worker supervisor panicked"),
    }
}

/// Owns the worker tasks. A worker ending is logged and leaves its siblings
/// running; the supervisor only stops on shutdown or when none are left.
struct Supervisor {
    shutdown_token: CancellationToken,
    workers: JoinSet<(String, eyre::Result<()>)>,
    shutdown_grace: Duration,
}

impl Supervisor {
    fn new(shutdown_token: CancellationToken, shutdown_grace: Duration) -> Self {
        Self {
            shutdown_token,
            workers: JoinSet::new(),
            shutdown_grace,
        }
    }

    fn worker_token(&self) -> CancellationToken {
        self.shutdown_token.child_token()
    }

    fn supervise<F>(&mut self, contract: String, worker: F)
    where
        F: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        self.workers.spawn(async move { (contract, worker.await) });
    }

    async fn run(mut self) -> eyre::Result<()> {
        info!(workers = self.workers.len(), "supervising workers");

        let reason: eyre::Result<&str> = loop {
            select! {
                biased;

                () = self.shutdown_token.cancelled() => break Ok("received shutdown signal"),

                Some(res) = self.workers.join_next() => {
                    match res {
                        Ok((contract, Ok(()))) => warn!(%contract, "worker exited"),
                        Ok((contract, Err(e))) => error!(%contract, error = ?e, "worker failed"),
                        Err(e) => error!(error = %e, "worker panicked"),
                    }
                    if self.workers.is_empty() {
                        break Err(eyre!("all workers exited"));
                    }
                }
            }
        };

        self.shutdown(reason).await
    }

    #[instrument(skip_all)]
    async fn shutdown(mut self, reason: eyre::Result<&'static str>) -> eyre::Result<()> {
        // workers may still be running if they all exited on their own
        self.shutdown_token.cancel();

        let message = format!(
            "waiting {} for {} workers to shutdown before aborting",
            humantime::format_duration(self.shutdown_grace),
            self.workers.len(),
        );
        match &reason {
            Ok(reason) => info!(%reason, message),
            Err(reason) => error!(%reason, message),
        };

        let drain = async {
            while let Some(res) = self.workers.join_next().await {
                match res {
                    Ok((contract, Err(e))) => error!(%contract, error = ?e, "worker failed"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "worker panicked"),
                }
            }
        };
        if tokio::time::timeout(self.shutdown_grace, drain).await.is_err() {
            warn!(remaining = self.workers.len(), "workers did not shut down in time, aborting");
            self.workers.abort_all();
        }

        reason.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_secs(25);

    #[tokio::test(start_paused = true)]
    async fn exited_worker_leaves_siblings_running() {
        let token = CancellationToken::new();
        let mut supervisor = Supervisor::new(token.clone(), GRACE);
        supervisor.supervise("hub1 (hub)".into(), async { Ok(()) });
        let worker_token = supervisor.worker_token();
        supervisor.supervise("unifier1 (unifier)".into(), async move {
            worker_token.cancelled().await;
            Ok(())
        });

        let run = tokio::spawn(supervisor.run());
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(!run.is_finished());

        token.cancel();
        run.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn all_workers_exiting_stops_the_supervisor() {
        let mut supervisor = Supervisor::new(CancellationToken::new(), GRACE);
        supervisor.supervise("hub1 (hub)".into(), async { Ok(()) });
        supervisor.supervise("unifier1 (unifier)".into(), async { Err(eyre!("boom")) });

        let err = supervisor.run().await.unwrap_err();
        assert!(err.to_string().contains("all workers exited"));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_workers_are_aborted_after_the_grace_period() {
        let token = CancellationToken::new();
        let mut supervisor = Supervisor::new(token.clone(), GRACE);
        supervisor.supervise("hub1 (hub)".into(), std::future::pending::<eyre::Result<()>>());

        token.cancel();
        let started = tokio::time::Instant::now();
        supervisor.run().await.unwrap();
        assert!(started.elapsed() >= GRACE);
    }

    #[tokio::test]
    async fn supervisor_errors_are_wrapped() {
        let err = supervisor_result(Ok(Err(eyre!("all workers exited")))).unwrap_err();
        assert_eq!(err.to_string(), "worker supervisor stopped");

        let panicked = tokio::spawn(async {
            if true {
                panic!("boom");
            }
            Ok::<(), eyre::Report>(())
        })
        .await;
        let err = supervisor_result(panicked).unwrap_err();
        assert_eq!(err.to_string(), "worker supervisor panicked");
    }
}

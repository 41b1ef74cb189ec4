//! The Supervisor owns the long-running services and manages their
//! lifecycle.
//!
//! The `SupervisorBuilder` wires the store, incident engine, alert sinks,
//! scheduler, and HTTP server together. `run` starts them, listens for
//! shutdown signals, and propagates a single root cancellation token through
//! every service so SIGINT/SIGTERM produce a clean exit.

mod builder;

use std::{sync::Arc, time::Duration};

pub use builder::SupervisorBuilder;
use thiserror::Error;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    engine::IncidentEngine,
    http_server::{self, ApiState},
    metrics::{GuardianMetrics, MetricsError},
    models::IncidentState,
    persistence::{error::PersistenceError, traits::GuardianRepository, SqliteStore},
    scheduler::Runner,
};

// Cadence of the background incidents_open gauge refresh.
const METRICS_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Represents the set of errors that can occur during the supervisor's
/// operation.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A required configuration was not provided to the `SupervisorBuilder`.
    #[error("Missing configuration for Supervisor")]
    MissingConfig,

    /// The store could not be opened or migrated.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// The metrics registry could not be assembled.
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// The store directory could not be created or the server socket could
    /// not be bound.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The primary runtime manager for the application.
pub struct Supervisor {
    config: Arc<AppConfig>,
    store: Arc<SqliteStore>,
    repo: Arc<dyn GuardianRepository>,
    engine: Arc<IncidentEngine>,
    metrics: Arc<GuardianMetrics>,
    cancellation_token: CancellationToken,
    join_set: JoinSet<()>,
}

impl Supervisor {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn builder() -> SupervisorBuilder {
        SupervisorBuilder::new()
    }

    /// Starts all services and blocks until shutdown completes.
    ///
    /// Shutdown is triggered by SIGINT/SIGTERM or by a critical task
    /// failure; either way the root token is cancelled, in-flight probes
    /// abort, and the store is closed before returning.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let cancellation_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let terminate = async {
                signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await;
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
                _ = terminate => tracing::info!("SIGTERM received, initiating graceful shutdown."),
                // A shutdown triggered elsewhere releases this task too.
                _ = cancellation_token.cancelled() => return,
            }

            cancellation_token.cancel();
        });

        self.refresh_incidents_gauge().await;
        let repo = self.repo.clone();
        let metrics = self.metrics.clone();
        let refresh_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            loop {
                tokio::select! {
                    _ = refresh_token.cancelled() => return,
                    _ = tokio::time::sleep(METRICS_REFRESH_INTERVAL) => {
                        match repo.list_incidents(Some(IncidentState::Open), 100).await {
                            Ok(open) => metrics.set_incidents_open(open.len() as i64),
                            Err(err) => {
                                tracing::warn!(error = %err, "Failed to refresh open-incident gauge.")
                            }
                        }
                    }
                }
            }
        });

        let api_state = ApiState::new(
            self.repo.clone(),
            self.engine.clone(),
            self.metrics.clone(),
            self.config.rpc_providers.clone(),
            self.config.dapps.clone(),
        );
        let listen_address = self.config.server.listen_address();
        let metrics_path = self.config.server.metrics_path.clone();
        let server_token = self.cancellation_token.clone();
        let fail_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            if let Err(err) =
                http_server::run_server(api_state, &listen_address, &metrics_path, server_token)
                    .await
            {
                tracing::error!(error = %err, "HTTP server failed, initiating shutdown.");
                fail_token.cancel();
            }
        });

        let runner = Arc::new(Runner::new(
            self.config.clone(),
            self.repo.clone(),
            self.engine.clone(),
            self.metrics.clone(),
        ));
        let runner_token = self.cancellation_token.clone();
        self.join_set.spawn(async move {
            runner.run(runner_token).await;
        });

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            "Supervisor started, monitoring {} rpc providers and {} dapps.",
            self.config.rpc_providers.len(),
            self.config.dapps.len(),
        );

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    tracing::info!("Supervisor cancellation signal received, shutting down...");
                    break;
                }

                Some(result) = self.join_set.join_next() => {
                    if let Err(err) = result {
                        tracing::error!("A critical task failed: {:?}. Initiating shutdown.", err);
                        self.cancellation_token.cancel();
                    }
                }
            }
        }

        while self.join_set.join_next().await.is_some() {}
        self.store.close().await;
        tracing::info!("Supervisor shut down cleanly.");
        Ok(())
    }

    async fn refresh_incidents_gauge(&self) {
        match self.repo.list_incidents(Some(IncidentState::Open), 100).await {
            Ok(open) => self.metrics.set_incidents_open(open.len() as i64),
            Err(err) => tracing::warn!(error = %err, "Failed to read open incidents at startup."),
        }
    }
}

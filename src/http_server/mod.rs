//! HTTP read API and metrics endpoint.

mod error;
mod incidents;
mod metrics;
mod reports;
mod status;

use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use error::ApiError;
use incidents::{get_incident, list_incidents};
use metrics::metrics as metrics_handler;
use reports::{create_report, list_reports};
use status::status;
use tokio_util::sync::CancellationToken;

use crate::{
    config::EndpointConfig, engine::IncidentEngine, metrics::GuardianMetrics,
    persistence::traits::GuardianRepository,
};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct ApiState {
    /// The persistence layer.
    repo: Arc<dyn GuardianRepository>,
    /// The incident engine, used for the provider recommendation.
    engine: Arc<IncidentEngine>,
    /// The metrics registry served at the metrics path.
    metrics: Arc<GuardianMetrics>,
    /// Configured RPC providers, in configuration order.
    rpc_endpoints: Arc<Vec<EndpointConfig>>,
    /// Configured dApps, in configuration order.
    dapp_endpoints: Arc<Vec<EndpointConfig>>,
}

impl ApiState {
    /// Bundles the server's dependencies.
    pub fn new(
        repo: Arc<dyn GuardianRepository>,
        engine: Arc<IncidentEngine>,
        metrics: Arc<GuardianMetrics>,
        rpc_endpoints: Vec<EndpointConfig>,
        dapp_endpoints: Vec<EndpointConfig>,
    ) -> Self {
        Self {
            repo,
            engine,
            metrics,
            rpc_endpoints: Arc::new(rpc_endpoints),
            dapp_endpoints: Arc::new(dapp_endpoints),
        }
    }
}

/// Liveness probe. Always 200 while the process runs.
async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Builds the API router.
pub fn router(state: ApiState, metrics_path: &str) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/status", get(status))
        .route("/v1/incidents", get(list_incidents))
        .route("/v1/incidents/{id}", get(get_incident))
        .route("/v1/report", post(create_report))
        .route("/v1/reports", get(list_reports))
        .route(metrics_path, get(metrics_handler))
        .with_state(state)
}

/// Binds `listen_address` and serves the API until the token is cancelled.
pub async fn run_server(
    state: ApiState,
    listen_address: &str,
    metrics_path: &str,
    cancellation_token: CancellationToken,
) -> Result<(), std::io::Error> {
    let app = router(state, metrics_path);
    let listener = tokio::net::TcpListener::bind(listen_address).await?;
    tracing::info!("HTTP server listening on {}", listen_address);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await
}

//! The sweep runner: one concurrent probe task per configured entity.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{AppConfig, EndpointConfig},
    engine::IncidentProcessor,
    metrics::GuardianMetrics,
    models::{EntityKind, ErrorCategory},
    persistence::traits::GuardianRepository,
    probers::{HttpProber, RpcProber},
};

// Per-entity check retention applied after each probe task.
const CHECK_RETENTION: i64 = 500;

/// Drives sweeps: an initial sweep immediately on start, then one per
/// configured interval. Sweeps are sequential; within a sweep every entity is
/// probed concurrently. A sweep that overruns its interval causes the missed
/// tick to be skipped, never queued.
pub struct Runner {
    config: Arc<AppConfig>,
    repo: Arc<dyn GuardianRepository>,
    engine: Arc<dyn IncidentProcessor>,
    metrics: Arc<GuardianMetrics>,
}

impl Runner {
    /// Creates a runner over the configured entities.
    pub fn new(
        config: Arc<AppConfig>,
        repo: Arc<dyn GuardianRepository>,
        engine: Arc<dyn IncidentProcessor>,
        metrics: Arc<GuardianMetrics>,
    ) -> Self {
        Self { config, repo, engine, metrics }
    }

    /// Runs until the token is cancelled. In-flight probe tasks are aborted
    /// on cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    tracing::info!("Runner cancellation signal received, stopping sweeps.");
                    return;
                }
                _ = ticker.tick() => {
                    self.sweep(&cancellation_token).await;
                }
            }
        }
    }

    /// One pass over all configured entities. Waits for every probe task to
    /// finish before returning.
    pub async fn sweep(&self, cancellation_token: &CancellationToken) {
        let mut tasks = JoinSet::new();

        for endpoint in &self.config.rpc_providers {
            let task = SweepTask::new(self);
            let endpoint = endpoint.clone();
            tasks.spawn(async move { task.check_rpc(&endpoint).await });
        }
        for endpoint in &self.config.dapps {
            let task = SweepTask::new(self);
            let endpoint = endpoint.clone();
            tasks.spawn(async move { task.check_dapp(&endpoint).await });
        }

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    tasks.abort_all();
                    return;
                }
                joined = tasks.join_next() => {
                    match joined {
                        Some(Err(err)) if err.is_panic() => {
                            tracing::error!(error = %err, "Probe task panicked.");
                        }
                        Some(_) => {}
                        None => return,
                    }
                }
            }
        }
    }
}

/// The per-entity slice of a sweep. Owns clones of the shared handles so each
/// task can be moved onto the runtime.
struct SweepTask {
    repo: Arc<dyn GuardianRepository>,
    engine: Arc<dyn IncidentProcessor>,
    metrics: Arc<GuardianMetrics>,
}

impl SweepTask {
    fn new(runner: &Runner) -> Self {
        Self {
            repo: runner.repo.clone(),
            engine: runner.engine.clone(),
            metrics: runner.metrics.clone(),
        }
    }

    async fn check_rpc(&self, endpoint: &EndpointConfig) {
        if let Err(err) =
            self.repo.ensure_entity(EntityKind::Rpc, &endpoint.name, &endpoint.url).await
        {
            tracing::error!(provider = %endpoint.name, error = %err, "Failed to upsert provider.");
            return;
        }

        let outcome = RpcProber::new(&endpoint.url, endpoint.timeout).probe().await;

        // Latency is only persisted for successes; the measurement on
        // failures stays in the logs.
        let latency = outcome.success.then_some(outcome.latency_ms);
        if let Err(err) = self
            .repo
            .insert_check(
                EntityKind::Rpc,
                &endpoint.name,
                outcome.success,
                latency,
                outcome.error_category,
            )
            .await
        {
            tracing::error!(provider = %endpoint.name, error = %err, "Failed to insert rpc check.");
            return;
        }
        self.metrics.record_check("rpc", &endpoint.name, outcome.success, outcome.latency_ms);

        if let Err(err) = self
            .engine
            .process_rpc_result(&endpoint.name, &endpoint.url, outcome.success, outcome.latency_ms)
            .await
        {
            tracing::error!(provider = %endpoint.name, error = %err, "Failed to process rpc incident.");
        }

        if let Err(err) =
            self.repo.trim_checks(EntityKind::Rpc, &endpoint.name, CHECK_RETENTION).await
        {
            tracing::warn!(provider = %endpoint.name, error = %err, "Failed to trim checks.");
        }

        tracing::debug!(
            provider = %endpoint.name,
            success = outcome.success,
            latency_ms = outcome.latency_ms,
            error = outcome.error_category.map(|c| c.as_str()).unwrap_or(""),
            ledger_version = outcome.ledger_version,
            "rpc check"
        );
    }

    async fn check_dapp(&self, endpoint: &EndpointConfig) {
        if let Err(err) =
            self.repo.ensure_entity(EntityKind::Dapp, &endpoint.name, &endpoint.url).await
        {
            tracing::error!(dapp = %endpoint.name, error = %err, "Failed to upsert dapp.");
            return;
        }

        let outcome = HttpProber::new(&endpoint.url, endpoint.timeout).probe().await;

        let latency = outcome.success.then_some(outcome.latency_ms);
        // A received-but-unhealthy status is the only failure detail the
        // generic probe can attribute.
        let error_category = (!outcome.success && outcome.status.is_some())
            .then_some(ErrorCategory::HttpStatus);
        if let Err(err) = self
            .repo
            .insert_check(EntityKind::Dapp, &endpoint.name, outcome.success, latency, error_category)
            .await
        {
            tracing::error!(dapp = %endpoint.name, error = %err, "Failed to insert dapp check.");
            return;
        }
        self.metrics.record_check("dapp", &endpoint.name, outcome.success, outcome.latency_ms);

        if let Err(err) =
            self.engine.process_dapp_result(&endpoint.name, &endpoint.url, outcome.success).await
        {
            tracing::error!(dapp = %endpoint.name, error = %err, "Failed to process dapp incident.");
        }

        if let Err(err) =
            self.repo.trim_checks(EntityKind::Dapp, &endpoint.name, CHECK_RETENTION).await
        {
            tracing::warn!(dapp = %endpoint.name, error = %err, "Failed to trim checks.");
        }

        tracing::debug!(
            dapp = %endpoint.name,
            success = outcome.success,
            latency_ms = outcome.latency_ms,
            "dapp check"
        );
    }
}

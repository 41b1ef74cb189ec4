//! This module provides the `SupervisorBuilder` for constructing a
//! `Supervisor`.

use std::{path::Path, sync::Arc};

use tokio_util::sync::CancellationToken;

use super::{Supervisor, SupervisorError};
use crate::{
    config::AppConfig,
    engine::IncidentEngine,
    metrics::GuardianMetrics,
    notification::DiscordAlerter,
    persistence::{traits::GuardianRepository, SqliteStore},
    version,
};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Assembles the store, engine, alert sinks, and metrics into a
    /// `Supervisor`.
    pub async fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = Arc::new(self.config.ok_or(SupervisorError::MissingConfig)?);

        if let Some(parent) = Path::new(&config.store_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = SqliteStore::new(&format!("sqlite:{}", config.store_path)).await?;
        store.run_migrations().await?;
        let store = Arc::new(store);
        let repo: Arc<dyn GuardianRepository> = store.clone();

        let metrics = Arc::new(GuardianMetrics::new()?);
        metrics.set_build_info(version::VERSION, version::COMMIT, version::BUILD_DATE);

        let mut engine = IncidentEngine::new(repo.clone(), config.thresholds);
        if config.discord.enabled {
            tracing::info!(
                application_id = %config.discord.application_id,
                "Discord alerting enabled."
            );
            engine.add_alert_sink(Arc::new(DiscordAlerter::new(
                &config.discord,
                &config.http_retry,
            )));
        }

        Ok(Supervisor {
            config,
            store,
            repo,
            engine: Arc::new(engine),
            metrics,
            cancellation_token: CancellationToken::new(),
            join_set: tokio::task::JoinSet::new(),
        })
    }
}

//! Reconciliation logic and provider recommendation.

use std::sync::Arc;

use async_trait::async_trait;

use super::{EngineOutcome, IncidentProcessor};
use crate::{
    config::Thresholds,
    models::{CheckRecord, EntityKind, Severity},
    notification::AlertSink,
    persistence::{error::PersistenceError, traits::GuardianRepository},
};

/// Summary written when an RPC incident opens on consecutive failures.
pub const RPC_FAILURE_SUMMARY: &str = "RPC unreachable or failing (consecutive failures).";
/// Summary written when an RPC incident closes.
pub const RPC_RECOVERY_SUMMARY: &str = "RPC recovered after consecutive successes.";
/// Summary written when a single sample crosses the critical latency bound.
pub const RPC_LATENCY_CRIT_SUMMARY: &str = "RPC latency critical (above threshold).";
/// Summary written when a single sample crosses the warning latency bound.
pub const RPC_LATENCY_WARN_SUMMARY: &str = "RPC latency elevated (warning).";
/// Summary written when a dApp incident opens.
pub const DAPP_FAILURE_SUMMARY: &str = "Endpoint unreachable or failing.";
/// Summary written when a dApp incident closes.
pub const DAPP_RECOVERY_SUMMARY: &str = "Endpoint recovered.";

// Latency sentinel that dominates any real average when a candidate has no
// successful checks in the window.
const NO_SUCCESS_LATENCY: f64 = 1e9;

/// Derives incident transitions from recent check rows and scores RPC
/// providers by recent behavior.
pub struct IncidentEngine {
    repo: Arc<dyn GuardianRepository>,
    thresholds: Thresholds,
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl IncidentEngine {
    /// Creates an engine over the given store with the configured thresholds.
    pub fn new(repo: Arc<dyn GuardianRepository>, thresholds: Thresholds) -> Self {
        Self { repo, thresholds, sinks: Vec::new() }
    }

    /// Registers an alert sink invoked on every open/close transition.
    pub fn add_alert_sink(&mut self, sink: Arc<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    /// The number of rows the engine reads per reconciliation.
    fn window(&self) -> i64 {
        (self.thresholds.consecutive_failures_for_incident
            + self.thresholds.recoveries_for_close
            + 2) as i64
    }

    async fn open(
        &self,
        kind: EntityKind,
        name: &str,
        url: &str,
        severity: Severity,
        summary: &str,
    ) -> Result<EngineOutcome, PersistenceError> {
        let id = self.repo.open_incident(kind, name, url, severity, summary).await?;
        self.repo.add_incident_update(id, summary).await?;
        self.fire_opened(id).await;
        tracing::info!(
            entity_type = kind.as_str(),
            entity_name = name,
            incident_id = id,
            severity = severity.as_str(),
            "incident opened"
        );
        Ok(EngineOutcome::Opened(id))
    }

    async fn close(
        &self,
        kind: EntityKind,
        name: &str,
        id: i64,
        summary: &str,
    ) -> Result<EngineOutcome, PersistenceError> {
        self.repo.close_incident(id, summary).await?;
        self.repo.add_incident_update(id, summary).await?;
        self.fire_closed(id).await;
        tracing::info!(
            entity_type = kind.as_str(),
            entity_name = name,
            incident_id = id,
            "incident closed"
        );
        Ok(EngineOutcome::Closed(id))
    }

    async fn fire_opened(&self, id: i64) {
        if self.sinks.is_empty() {
            return;
        }
        let incident = match self.repo.get_incident(id).await {
            Ok(incident) => incident,
            Err(err) => {
                tracing::warn!(incident_id = id, error = %err, "Failed to load incident for alerting.");
                return;
            }
        };
        for sink in &self.sinks {
            if let Err(err) = sink.incident_opened(&incident).await {
                tracing::warn!(incident_id = id, error = %err, "Alert sink failed on open.");
            }
        }
    }

    async fn fire_closed(&self, id: i64) {
        if self.sinks.is_empty() {
            return;
        }
        let incident = match self.repo.get_incident(id).await {
            Ok(incident) => incident,
            Err(err) => {
                tracing::warn!(incident_id = id, error = %err, "Failed to load incident for alerting.");
                return;
            }
        };
        for sink in &self.sinks {
            if let Err(err) = sink.incident_closed(&incident).await {
                tracing::warn!(incident_id = id, error = %err, "Alert sink failed on close.");
            }
        }
    }

    /// Scores the named providers over their recent checks and returns the
    /// best one, or an empty string for an empty candidate list.
    ///
    /// `score = success_rate * 1e6 / (1 + avg_latency_ms)`; candidates whose
    /// checks cannot be read or that have no successful rows are dominated by
    /// a large latency sentinel. Ties keep the earlier candidate.
    pub async fn recommend_rpc(&self, names: &[String], window: i64) -> String {
        if names.is_empty() {
            return String::new();
        }
        let window = if window <= 0 { 50 } else { window };

        let mut best = String::new();
        let mut best_score = -1.0f64;
        for name in names {
            let (success_rate, avg_latency_ms) =
                match self.repo.recent_checks(EntityKind::Rpc, name, window).await {
                    Ok(checks) if !checks.is_empty() => score_inputs(&checks),
                    Ok(_) => (0.0, NO_SUCCESS_LATENCY),
                    Err(err) => {
                        tracing::warn!(provider = %name, error = %err, "Failed to read checks for recommendation.");
                        (0.0, NO_SUCCESS_LATENCY)
                    }
                };
            let score = success_rate * 1e6 / (1.0 + avg_latency_ms);
            if score > best_score {
                best_score = score;
                best = name.clone();
            }
        }
        best
    }
}

/// Success rate and average latency over successful rows, with the sentinel
/// when no row succeeded.
fn score_inputs(checks: &[CheckRecord]) -> (f64, f64) {
    let mut success_count = 0usize;
    let mut latency_sum = 0i64;
    for check in checks {
        if check.success {
            success_count += 1;
            if let Some(latency) = check.latency_ms {
                latency_sum += latency;
            }
        }
    }
    let success_rate = success_count as f64 / checks.len() as f64;
    let avg_latency =
        if success_count > 0 { latency_sum as f64 / success_count as f64 } else { NO_SUCCESS_LATENCY };
    (success_rate, avg_latency)
}

/// Counts the leading rows of a newest-first sequence whose `success` equals
/// `value`, stopping at the first mismatch.
fn streak(checks: &[CheckRecord], value: bool) -> usize {
    checks.iter().take_while(|c| c.success == value).count()
}

#[async_trait]
impl IncidentProcessor for IncidentEngine {
    async fn process_rpc_result(
        &self,
        name: &str,
        url: &str,
        success: bool,
        latency_ms: i64,
    ) -> Result<EngineOutcome, PersistenceError> {
        let checks = self.repo.recent_checks(EntityKind::Rpc, name, self.window()).await?;
        let open_id = self.repo.has_open_incident(EntityKind::Rpc, name).await?;

        if let Some(id) = open_id {
            if success && streak(&checks, true) >= self.thresholds.recoveries_for_close {
                return self.close(EntityKind::Rpc, name, id, RPC_RECOVERY_SUMMARY).await;
            }
            return Ok(EngineOutcome::NoChange);
        }

        if !success {
            if streak(&checks, false) >= self.thresholds.consecutive_failures_for_incident {
                return self
                    .open(EntityKind::Rpc, name, url, Severity::Crit, RPC_FAILURE_SUMMARY)
                    .await;
            }
            return Ok(EngineOutcome::NoChange);
        }

        // Latency incidents open on a single sample; no streak required.
        if latency_ms >= self.thresholds.latency_crit_ms {
            return self
                .open(EntityKind::Rpc, name, url, Severity::Crit, RPC_LATENCY_CRIT_SUMMARY)
                .await;
        }
        if latency_ms >= self.thresholds.latency_warn_ms {
            return self
                .open(EntityKind::Rpc, name, url, Severity::Warn, RPC_LATENCY_WARN_SUMMARY)
                .await;
        }
        Ok(EngineOutcome::NoChange)
    }

    async fn process_dapp_result(
        &self,
        name: &str,
        url: &str,
        success: bool,
    ) -> Result<EngineOutcome, PersistenceError> {
        let checks = self.repo.recent_checks(EntityKind::Dapp, name, self.window()).await?;
        let open_id = self.repo.has_open_incident(EntityKind::Dapp, name).await?;

        if let Some(id) = open_id {
            if success && streak(&checks, true) >= self.thresholds.recoveries_for_close {
                return self.close(EntityKind::Dapp, name, id, DAPP_RECOVERY_SUMMARY).await;
            }
            return Ok(EngineOutcome::NoChange);
        }

        if !success && streak(&checks, false) >= self.thresholds.consecutive_failures_for_incident {
            return self
                .open(EntityKind::Dapp, name, url, Severity::Crit, DAPP_FAILURE_SUMMARY)
                .await;
        }
        Ok(EngineOutcome::NoChange)
    }
}

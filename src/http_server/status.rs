//! The `/v1/status` endpoint: recommendation, last-check snapshot, and open
//! incidents.

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use chrono::SecondsFormat;
use serde::Serialize;

use super::{ApiError, ApiState};
use crate::{
    models::{EntityKind, IncidentState},
    persistence::traits::GuardianRepository as _,
};

/// Represents the response from the `/v1/status` endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// The currently recommended RPC provider, empty when unknown.
    pub recommended_provider: String,
    /// Last-check snapshot per configured provider.
    pub rpc_providers: Vec<ProviderStatus>,
    /// Last-check snapshot per configured dApp.
    pub dapps: Vec<DappStatus>,
    /// Up to 20 currently open incidents.
    pub open_incidents: Vec<IncidentSummary>,
}

/// Last-check snapshot of one RPC provider.
#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    /// Provider name.
    pub name: String,
    /// Configured URL.
    pub url: String,
    /// Whether the most recent check succeeded.
    pub healthy: bool,
    /// Latency of the most recent successful check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
    /// Error category of the most recent failed check.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub last_error: String,
}

/// Last-check snapshot of one dApp.
#[derive(Debug, Serialize)]
pub struct DappStatus {
    /// dApp name.
    pub name: String,
    /// Configured URL.
    pub url: String,
    /// Whether the most recent check succeeded.
    pub healthy: bool,
    /// Latency of the most recent successful check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<i64>,
}

/// Abbreviated view of an open incident.
#[derive(Debug, Serialize)]
pub struct IncidentSummary {
    /// Incident id.
    pub id: i64,
    /// Kind of the affected entity.
    pub entity_type: String,
    /// Name of the affected entity.
    pub entity_name: String,
    /// Severity chosen at open time.
    pub severity: String,
    /// Current summary.
    pub summary: String,
    /// RFC3339 open time.
    pub started_at: String,
}

pub async fn status(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let rpc_names: Vec<String> =
        state.rpc_endpoints.iter().map(|endpoint| endpoint.name.clone()).collect();
    let recommended_provider = state.engine.recommend_rpc(&rpc_names, 50).await;

    let mut rpc_providers = Vec::with_capacity(state.rpc_endpoints.len());
    for endpoint in state.rpc_endpoints.iter() {
        let check =
            state.repo.recent_checks(EntityKind::Rpc, &endpoint.name, 1).await?.into_iter().next();
        let (healthy, latency_ms, last_error) = match check {
            Some(check) => {
                (check.success, check.latency_ms, check.error_category.unwrap_or_default())
            }
            None => (false, None, String::new()),
        };
        rpc_providers.push(ProviderStatus {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            healthy,
            latency_ms,
            last_error,
        });
    }

    let mut dapps = Vec::with_capacity(state.dapp_endpoints.len());
    for endpoint in state.dapp_endpoints.iter() {
        let check =
            state.repo.recent_checks(EntityKind::Dapp, &endpoint.name, 1).await?.into_iter().next();
        let (healthy, latency_ms) = match check {
            Some(check) => (check.success, check.latency_ms),
            None => (false, None),
        };
        dapps.push(DappStatus {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            healthy,
            latency_ms,
        });
    }

    let open_incidents = state
        .repo
        .list_incidents(Some(IncidentState::Open), 20)
        .await?
        .into_iter()
        .map(|incident| IncidentSummary {
            id: incident.id,
            entity_type: incident.entity_kind.as_str().to_string(),
            entity_name: incident.entity_name,
            severity: incident.severity.as_str().to_string(),
            summary: incident.summary,
            started_at: incident.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
        .collect();

    Ok(Json(StatusResponse { recommended_provider, rpc_providers, dapps, open_incidents }))
}

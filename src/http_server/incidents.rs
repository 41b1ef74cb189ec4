//! Handlers for incident listing and detail.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiState};
use crate::{
    models::{Incident, IncidentState},
    persistence::traits::GuardianRepository as _,
};

const MAX_LIST_LIMIT: i64 = 100;
const DEFAULT_LIST_LIMIT: i64 = 50;

/// Query parameters accepted by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

/// Clamps a textual limit to `(0, 100]`, keeping the default for anything
/// unparseable or out of range.
pub(super) fn parse_limit(limit: Option<&str>) -> i64 {
    match limit.and_then(|s| s.parse::<i64>().ok()) {
        Some(n) if n > 0 && n <= MAX_LIST_LIMIT => n,
        _ => DEFAULT_LIST_LIMIT,
    }
}

#[derive(Debug, Serialize)]
struct IncidentRow {
    id: i64,
    entity_type: String,
    entity_name: String,
    entity_url: String,
    state: String,
    severity: String,
    summary: String,
    started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ended_at: Option<String>,
}

impl From<Incident> for IncidentRow {
    fn from(incident: Incident) -> Self {
        IncidentRow {
            id: incident.id,
            entity_type: incident.entity_kind.as_str().to_string(),
            entity_name: incident.entity_name,
            entity_url: incident.entity_url,
            state: incident.state.as_str().to_string(),
            severity: incident.severity.as_str().to_string(),
            summary: incident.summary,
            started_at: incident.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ended_at: incident
                .ended_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

pub async fn list_incidents(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state_filter = match query.state.as_deref() {
        None | Some("") => None,
        Some(value) => Some(
            IncidentState::parse(value)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid state: {value}")))?,
        ),
    };
    let limit = parse_limit(query.limit.as_deref());

    let incidents = state.repo.list_incidents(state_filter, limit).await?;
    let rows: Vec<IncidentRow> = incidents.into_iter().map(IncidentRow::from).collect();
    Ok(Json(rows))
}

#[derive(Debug, Serialize)]
struct UpdateRow {
    message: String,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct IncidentDetail {
    #[serde(flatten)]
    incident: IncidentRow,
    updates: Vec<UpdateRow>,
}

pub async fn get_incident(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: i64 = id
        .parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest("invalid incident id".to_string()))?;

    let incident = state
        .repo
        .get_incident(id)
        .await
        .map_err(|_| ApiError::NotFound("incident not found".to_string()))?;
    let updates = state
        .repo
        .incident_updates(id)
        .await?
        .into_iter()
        .map(|update| UpdateRow {
            message: update.message,
            created_at: update.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
        .collect();

    Ok(Json(IncidentDetail { incident: IncidentRow::from(incident), updates }))
}

//! Handlers for user report submission and the redacted report list.

use axum::{
    extract::{
        rejection::JsonRejection,
        Query, State,
    },
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::json;

use super::{
    incidents::{parse_limit, ListQuery},
    ApiError, ApiState,
};
use crate::{models::NewReport, persistence::traits::GuardianRepository as _};

pub async fn create_report(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<NewReport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut report) =
        payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    if report.issue_type.is_empty() {
        return Err(ApiError::BadRequest("issue_type required".to_string()));
    }

    // The transport-observed user agent wins over whatever the body claims.
    if let Some(agent) = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
        if !agent.is_empty() {
            report.user_agent = agent.to_string();
        }
    }

    let id = state.repo.insert_report(report).await?;
    state.metrics.inc_reports_total();
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// A report as exposed by the list endpoint: wallet, url, tx_hash, and
/// user_agent are withheld.
#[derive(Debug, Serialize)]
struct RedactedReport {
    id: i64,
    issue_type: String,
    device: String,
    region: String,
    description: String,
    created_at: String,
}

pub async fn list_reports(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = parse_limit(query.limit.as_deref());
    let reports = state.repo.list_reports(limit).await?;
    let rows: Vec<RedactedReport> = reports
        .into_iter()
        .map(|report| RedactedReport {
            id: report.id,
            issue_type: report.issue_type,
            device: report.device,
            region: report.region,
            description: report.description,
            created_at: report.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
        .collect();
    Ok(Json(rows))
}

//! The Prometheus text endpoint.

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
};

use super::{ApiError, ApiState};

pub async fn metrics(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|err| ApiError::InternalServerError(err.to_string()))?;
    Ok((StatusCode::OK, [(CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

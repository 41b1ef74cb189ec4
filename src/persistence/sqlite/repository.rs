//! `GuardianRepository` implementation for `SqliteStore`.

use async_trait::async_trait;

use super::{format_time, parse_stored_time, SqliteStore};
use crate::{
    models::{
        truncate, CheckRecord, EntityKind, ErrorCategory, Incident, IncidentState, IncidentUpdate,
        NewReport, Report, Severity, MAX_REPORT_DESCRIPTION, MAX_REPORT_DEVICE,
        MAX_REPORT_ISSUE_TYPE, MAX_REPORT_REGION, MAX_REPORT_TX_HASH, MAX_REPORT_URL,
        MAX_REPORT_USER_AGENT, MAX_REPORT_WALLET,
    },
    persistence::{error::PersistenceError, traits::GuardianRepository},
};

// Helper structs for mapping from database rows.

#[derive(sqlx::FromRow)]
struct CheckRow {
    id: i64,
    entity_type: String,
    entity_name: String,
    success: bool,
    latency_ms: Option<i64>,
    error_category: Option<String>,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: i64,
    entity_type: String,
    entity_name: String,
    entity_url: Option<String>,
    state: String,
    severity: String,
    summary: String,
    started_at: String,
    ended_at: Option<String>,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct UpdateRow {
    id: i64,
    incident_id: i64,
    message: String,
    created_at: String,
}

#[derive(sqlx::FromRow)]
struct ReportRow {
    id: i64,
    issue_type: String,
    wallet: Option<String>,
    device: Option<String>,
    region: Option<String>,
    description: Option<String>,
    url: Option<String>,
    tx_hash: Option<String>,
    user_agent: Option<String>,
    incident_id: Option<i64>,
    created_at: String,
}

fn entity_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Rpc => "providers",
        EntityKind::Dapp => "dapps",
    }
}

fn operation_failed(err: sqlx::Error) -> PersistenceError {
    PersistenceError::OperationFailed(err.to_string())
}

impl TryFrom<CheckRow> for CheckRecord {
    type Error = PersistenceError;

    fn try_from(row: CheckRow) -> Result<Self, Self::Error> {
        let entity_kind = EntityKind::parse(&row.entity_type).ok_or_else(|| {
            PersistenceError::OperationFailed(format!("unknown entity type: {}", row.entity_type))
        })?;
        Ok(CheckRecord {
            id: row.id,
            entity_kind,
            entity_name: row.entity_name,
            success: row.success,
            latency_ms: row.latency_ms,
            error_category: row.error_category,
            created_at: parse_stored_time(&row.created_at),
        })
    }
}

impl TryFrom<IncidentRow> for Incident {
    type Error = PersistenceError;

    fn try_from(row: IncidentRow) -> Result<Self, Self::Error> {
        let entity_kind = EntityKind::parse(&row.entity_type).ok_or_else(|| {
            PersistenceError::OperationFailed(format!("unknown entity type: {}", row.entity_type))
        })?;
        let state = IncidentState::parse(&row.state).ok_or_else(|| {
            PersistenceError::OperationFailed(format!("unknown incident state: {}", row.state))
        })?;
        let severity = Severity::parse(&row.severity).ok_or_else(|| {
            PersistenceError::OperationFailed(format!("unknown severity: {}", row.severity))
        })?;
        Ok(Incident {
            id: row.id,
            entity_kind,
            entity_name: row.entity_name,
            entity_url: row.entity_url.unwrap_or_default(),
            state,
            severity,
            summary: row.summary,
            started_at: parse_stored_time(&row.started_at),
            ended_at: row.ended_at.as_deref().map(parse_stored_time),
            created_at: parse_stored_time(&row.created_at),
        })
    }
}

impl From<UpdateRow> for IncidentUpdate {
    fn from(row: UpdateRow) -> Self {
        IncidentUpdate {
            id: row.id,
            incident_id: row.incident_id,
            message: row.message,
            created_at: parse_stored_time(&row.created_at),
        }
    }
}

impl From<ReportRow> for Report {
    fn from(row: ReportRow) -> Self {
        Report {
            id: row.id,
            issue_type: row.issue_type,
            wallet: row.wallet.unwrap_or_default(),
            device: row.device.unwrap_or_default(),
            region: row.region.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            url: row.url.unwrap_or_default(),
            tx_hash: row.tx_hash.unwrap_or_default(),
            user_agent: row.user_agent.unwrap_or_default(),
            incident_id: row.incident_id,
            created_at: parse_stored_time(&row.created_at),
        }
    }
}

#[async_trait]
impl GuardianRepository for SqliteStore {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn ensure_entity(
        &self,
        kind: EntityKind,
        name: &str,
        url: &str,
    ) -> Result<i64, PersistenceError> {
        let table = entity_table(kind);
        let existing: Option<i64> =
            sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE name = ?"))
                .bind(name)
                .fetch_optional(self.pool())
                .await
                .map_err(operation_failed)?;

        if let Some(id) = existing {
            sqlx::query(&format!("UPDATE {table} SET url = ? WHERE id = ?"))
                .bind(url)
                .bind(id)
                .execute(self.pool())
                .await
                .map_err(operation_failed)?;
            return Ok(id);
        }

        let now = format_time(self.clock().now_utc());
        let result =
            sqlx::query(&format!("INSERT INTO {table} (name, url, created_at) VALUES (?, ?, ?)"))
                .bind(name)
                .bind(url)
                .bind(&now)
                .execute(self.pool())
                .await
                .map_err(operation_failed)?;
        Ok(result.last_insert_rowid())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn insert_check(
        &self,
        kind: EntityKind,
        name: &str,
        success: bool,
        latency_ms: Option<i64>,
        error_category: Option<ErrorCategory>,
    ) -> Result<(), PersistenceError> {
        let now = format_time(self.clock().now_utc());
        sqlx::query(
            "INSERT INTO checks (entity_type, entity_name, success, latency_ms, error_category, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(kind.as_str())
        .bind(name)
        .bind(success)
        .bind(latency_ms)
        .bind(error_category.map(|c| c.as_str()))
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(operation_failed)?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn recent_checks(
        &self,
        kind: EntityKind,
        name: &str,
        limit: i64,
    ) -> Result<Vec<CheckRecord>, PersistenceError> {
        let limit = if limit <= 0 { 100 } else { limit };
        let rows: Vec<CheckRow> = sqlx::query_as(
            "SELECT id, entity_type, entity_name, success, latency_ms, error_category, created_at
             FROM checks WHERE entity_type = ? AND entity_name = ?
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(kind.as_str())
        .bind(name)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(operation_failed)?;
        rows.into_iter().map(CheckRecord::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn trim_checks(
        &self,
        kind: EntityKind,
        name: &str,
        keep: i64,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            "DELETE FROM checks WHERE entity_type = ? AND entity_name = ? AND id NOT IN (
                 SELECT id FROM checks WHERE entity_type = ? AND entity_name = ?
                 ORDER BY created_at DESC, id DESC LIMIT ?
             )",
        )
        .bind(kind.as_str())
        .bind(name)
        .bind(kind.as_str())
        .bind(name)
        .bind(keep)
        .execute(self.pool())
        .await
        .map_err(operation_failed)?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn has_open_incident(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<i64>, PersistenceError> {
        sqlx::query_scalar(
            "SELECT id FROM incidents WHERE entity_type = ? AND entity_name = ? AND state = ?",
        )
        .bind(kind.as_str())
        .bind(name)
        .bind(IncidentState::Open.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(operation_failed)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn open_incident(
        &self,
        kind: EntityKind,
        name: &str,
        url: &str,
        severity: Severity,
        summary: &str,
    ) -> Result<i64, PersistenceError> {
        let now = format_time(self.clock().now_utc());
        let result = sqlx::query(
            "INSERT INTO incidents (entity_type, entity_name, entity_url, state, severity, summary, started_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(kind.as_str())
        .bind(name)
        .bind(url)
        .bind(IncidentState::Open.as_str())
        .bind(severity.as_str())
        .bind(summary)
        .bind(&now)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(operation_failed)?;
        Ok(result.last_insert_rowid())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn close_incident(&self, id: i64, summary: &str) -> Result<(), PersistenceError> {
        let now = format_time(self.clock().now_utc());
        sqlx::query("UPDATE incidents SET state = ?, ended_at = ?, summary = ? WHERE id = ?")
            .bind(IncidentState::Closed.as_str())
            .bind(&now)
            .bind(summary)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(operation_failed)?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn get_incident(&self, id: i64) -> Result<Incident, PersistenceError> {
        let row: Option<IncidentRow> = sqlx::query_as(
            "SELECT id, entity_type, entity_name, entity_url, state, severity, summary, started_at, ended_at, created_at
             FROM incidents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(operation_failed)?;
        match row {
            Some(row) => Incident::try_from(row),
            None => Err(PersistenceError::NotFound(format!("incident {id}"))),
        }
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn list_incidents(
        &self,
        state: Option<IncidentState>,
        limit: i64,
    ) -> Result<Vec<Incident>, PersistenceError> {
        let limit = if limit <= 0 { 50 } else { limit };
        let rows: Vec<IncidentRow> = match state {
            Some(state) => sqlx::query_as(
                "SELECT id, entity_type, entity_name, entity_url, state, severity, summary, started_at, ended_at, created_at
                 FROM incidents WHERE state = ? ORDER BY started_at DESC, id DESC LIMIT ?",
            )
            .bind(state.as_str())
            .bind(limit)
            .fetch_all(self.pool())
            .await
            .map_err(operation_failed)?,
            None => sqlx::query_as(
                "SELECT id, entity_type, entity_name, entity_url, state, severity, summary, started_at, ended_at, created_at
                 FROM incidents ORDER BY started_at DESC, id DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(self.pool())
            .await
            .map_err(operation_failed)?,
        };
        rows.into_iter().map(Incident::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn add_incident_update(
        &self,
        incident_id: i64,
        message: &str,
    ) -> Result<(), PersistenceError> {
        let now = format_time(self.clock().now_utc());
        sqlx::query("INSERT INTO incident_updates (incident_id, message, created_at) VALUES (?, ?, ?)")
            .bind(incident_id)
            .bind(message)
            .bind(&now)
            .execute(self.pool())
            .await
            .map_err(operation_failed)?;
        Ok(())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn incident_updates(
        &self,
        incident_id: i64,
    ) -> Result<Vec<IncidentUpdate>, PersistenceError> {
        let rows: Vec<UpdateRow> = sqlx::query_as(
            "SELECT id, incident_id, message, created_at FROM incident_updates
             WHERE incident_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(incident_id)
        .fetch_all(self.pool())
        .await
        .map_err(operation_failed)?;
        Ok(rows.into_iter().map(IncidentUpdate::from).collect())
    }

    #[tracing::instrument(skip(self, report), level = "debug")]
    async fn insert_report(&self, report: NewReport) -> Result<i64, PersistenceError> {
        let now = format_time(self.clock().now_utc());
        let result = sqlx::query(
            "INSERT INTO reports (issue_type, wallet, device, region, description, url, tx_hash, user_agent, incident_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(truncate(&report.issue_type, MAX_REPORT_ISSUE_TYPE))
        .bind(truncate(&report.wallet, MAX_REPORT_WALLET))
        .bind(truncate(&report.device, MAX_REPORT_DEVICE))
        .bind(truncate(&report.region, MAX_REPORT_REGION))
        .bind(truncate(&report.description, MAX_REPORT_DESCRIPTION))
        .bind(truncate(&report.url, MAX_REPORT_URL))
        .bind(truncate(&report.tx_hash, MAX_REPORT_TX_HASH))
        .bind(truncate(&report.user_agent, MAX_REPORT_USER_AGENT))
        .bind(report.incident_id)
        .bind(&now)
        .execute(self.pool())
        .await
        .map_err(operation_failed)?;
        Ok(result.last_insert_rowid())
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn list_reports(&self, limit: i64) -> Result<Vec<Report>, PersistenceError> {
        let limit = if limit <= 0 { 50 } else { limit };
        let rows: Vec<ReportRow> = sqlx::query_as(
            "SELECT id, issue_type, wallet, device, region, description, url, tx_hash, user_agent, incident_id, created_at
             FROM reports ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(operation_failed)?;
        Ok(rows.into_iter().map(Report::from).collect())
    }
}

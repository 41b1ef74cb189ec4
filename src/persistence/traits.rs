//! The persistence interface the rest of the application programs against.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::{
    CheckRecord, EntityKind, ErrorCategory, Incident, IncidentState, IncidentUpdate, NewReport,
    Report, Severity,
};

/// Single-writer relational store for entities, checks, incidents, and
/// reports.
///
/// Callers enforce the one-open-incident-per-entity invariant by consulting
/// [`has_open_incident`](GuardianRepository::has_open_incident) before
/// opening; `open_incident` itself inserts unconditionally.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GuardianRepository: Send + Sync {
    /// Upserts an entity by unique name, updating its URL on hit. Returns the
    /// row id.
    async fn ensure_entity(
        &self,
        kind: EntityKind,
        name: &str,
        url: &str,
    ) -> Result<i64, PersistenceError>;

    /// Appends a probe outcome row.
    async fn insert_check(
        &self,
        kind: EntityKind,
        name: &str,
        success: bool,
        latency_ms: Option<i64>,
        error_category: Option<ErrorCategory>,
    ) -> Result<(), PersistenceError>;

    /// Returns up to `limit` check rows for the entity, newest first (ties
    /// broken by id). `limit <= 0` means the default of 100.
    async fn recent_checks(
        &self,
        kind: EntityKind,
        name: &str,
        limit: i64,
    ) -> Result<Vec<CheckRecord>, PersistenceError>;

    /// Deletes all check rows for the entity except the `keep` newest.
    async fn trim_checks(
        &self,
        kind: EntityKind,
        name: &str,
        keep: i64,
    ) -> Result<(), PersistenceError>;

    /// Returns the id of the entity's open incident, if one exists.
    async fn has_open_incident(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Option<i64>, PersistenceError>;

    /// Inserts a new open incident and returns its id.
    async fn open_incident(
        &self,
        kind: EntityKind,
        name: &str,
        url: &str,
        severity: Severity,
        summary: &str,
    ) -> Result<i64, PersistenceError>;

    /// Transitions an incident to closed, stamping `ended_at` and overwriting
    /// the summary.
    async fn close_incident(&self, id: i64, summary: &str) -> Result<(), PersistenceError>;

    /// Fetches one incident by id.
    async fn get_incident(&self, id: i64) -> Result<Incident, PersistenceError>;

    /// Lists incidents, newest first by `started_at`, optionally filtered by
    /// state. `limit <= 0` means the default of 50.
    async fn list_incidents(
        &self,
        state: Option<IncidentState>,
        limit: i64,
    ) -> Result<Vec<Incident>, PersistenceError>;

    /// Appends an update row to an incident.
    async fn add_incident_update(
        &self,
        incident_id: i64,
        message: &str,
    ) -> Result<(), PersistenceError>;

    /// Returns an incident's updates, oldest first.
    async fn incident_updates(
        &self,
        incident_id: i64,
    ) -> Result<Vec<IncidentUpdate>, PersistenceError>;

    /// Persists a user report, truncating every string field to its maximum.
    /// Returns the row id.
    async fn insert_report(&self, report: NewReport) -> Result<i64, PersistenceError>;

    /// Lists reports, newest first. `limit <= 0` means the default of 50.
    async fn list_reports(&self, limit: i64) -> Result<Vec<Report>, PersistenceError>;
}

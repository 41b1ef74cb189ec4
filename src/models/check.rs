use chrono::{DateTime, Utc};
use serde::Serialize;

use super::EntityKind;

/// One probe outcome, as persisted in the `checks` table.
///
/// Rows are append-only and totally ordered per entity by `created_at`, ties
/// broken by `id`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRecord {
    /// Row id.
    pub id: i64,
    /// The kind of the probed entity.
    pub entity_kind: EntityKind,
    /// The configured name of the probed entity.
    pub entity_name: String,
    /// Whether the probe succeeded.
    pub success: bool,
    /// Wall-clock latency. Present for successful RPC probes; absent for
    /// failures regardless of what the prober measured.
    pub latency_ms: Option<i64>,
    /// Failure category for failed probes.
    pub error_category: Option<String>,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

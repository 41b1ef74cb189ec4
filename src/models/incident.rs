use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityKind;

/// Lifecycle state of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentState {
    /// The incident is ongoing.
    Open,
    /// The incident has been resolved.
    Closed,
}

impl IncidentState {
    /// The stable string form used in the `incidents.state` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentState::Open => "open",
            IncidentState::Closed => "closed",
        }
    }

    /// Parses the stored string form back into a state.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(IncidentState::Open),
            "closed" => Some(IncidentState::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for IncidentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity assigned when an incident is opened. It never changes afterwards;
/// in particular a WARN incident is not upgraded to CRIT while it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Degraded but functional (elevated latency).
    #[serde(rename = "WARN")]
    Warn,
    /// Unreachable, failing, or critically slow.
    #[serde(rename = "CRIT")]
    Crit,
}

impl Severity {
    /// The stable string form used in the `incidents.severity` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warn => "WARN",
            Severity::Crit => "CRIT",
        }
    }

    /// Parses the stored string form back into a severity.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WARN" => Some(Severity::Warn),
            "CRIT" => Some(Severity::Crit),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state-machine record bracketing a period of unhealthy behavior for one
/// entity. At most one open incident exists per `(entity_kind, entity_name)`.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    /// Row id.
    pub id: i64,
    /// Kind of the affected entity.
    pub entity_kind: EntityKind,
    /// Name of the affected entity.
    pub entity_name: String,
    /// URL of the affected entity at the time the incident was opened.
    pub entity_url: String,
    /// Current lifecycle state.
    pub state: IncidentState,
    /// Severity chosen at open time.
    pub severity: Severity,
    /// Human-readable summary; overwritten on close.
    pub summary: String,
    /// When the incident was opened.
    pub started_at: DateTime<Utc>,
    /// When the incident was closed. Set if and only if `state == Closed`.
    pub ended_at: Option<DateTime<Utc>>,
    /// When the row was written.
    pub created_at: DateTime<Utc>,
}

/// An append-only annotation on an incident. Every open and close writes one
/// update carrying the incident's summary at that moment.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentUpdate {
    /// Row id.
    pub id: i64,
    /// The incident this update belongs to.
    pub incident_id: i64,
    /// Update text.
    pub message: String,
    /// When the update was written.
    pub created_at: DateTime<Utc>,
}

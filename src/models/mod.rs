//! Core data types shared across the store, probers, engine, and API.

mod check;
mod entity;
mod incident;
mod probe;
mod report;

pub use check::CheckRecord;
pub use entity::EntityKind;
pub use incident::{Incident, IncidentState, IncidentUpdate, Severity};
pub use probe::{ErrorCategory, HttpProbeOutcome, RpcProbeOutcome};
pub use report::{
    truncate, NewReport, Report, MAX_REPORT_DESCRIPTION, MAX_REPORT_DEVICE,
    MAX_REPORT_ISSUE_TYPE, MAX_REPORT_REGION, MAX_REPORT_TX_HASH, MAX_REPORT_URL,
    MAX_REPORT_USER_AGENT, MAX_REPORT_WALLET,
};

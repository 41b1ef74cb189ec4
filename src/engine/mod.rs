//! The incident engine: a stateless state machine over recent check rows.
//!
//! The engine holds no mutable state of its own. Every decision is a function
//! of the most recent window of check rows read from the store plus the
//! entity's current open-incident status, which keeps it correct across
//! restarts without any replay logic.

mod incident_engine;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

pub use incident_engine::{
    IncidentEngine, DAPP_FAILURE_SUMMARY, DAPP_RECOVERY_SUMMARY, RPC_FAILURE_SUMMARY,
    RPC_LATENCY_CRIT_SUMMARY, RPC_LATENCY_WARN_SUMMARY, RPC_RECOVERY_SUMMARY,
};

use crate::persistence::error::PersistenceError;

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    /// An incident was opened; carries its id.
    Opened(i64),
    /// The open incident was closed; carries its id.
    Closed(i64),
    /// No transition.
    NoChange,
}

impl EngineOutcome {
    /// True when an incident was opened.
    pub fn opened(&self) -> bool {
        matches!(self, EngineOutcome::Opened(_))
    }

    /// True when an incident was closed.
    pub fn closed(&self) -> bool {
        matches!(self, EngineOutcome::Closed(_))
    }
}

/// The seam between the scheduler and the incident engine.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IncidentProcessor: Send + Sync {
    /// Reconciles incident state for an RPC entity after its check row has
    /// been inserted.
    async fn process_rpc_result(
        &self,
        name: &str,
        url: &str,
        success: bool,
        latency_ms: i64,
    ) -> Result<EngineOutcome, PersistenceError>;

    /// Reconciles incident state for a dApp entity after its check row has
    /// been inserted.
    async fn process_dapp_result(
        &self,
        name: &str,
        url: &str,
        success: bool,
    ) -> Result<EngineOutcome, PersistenceError>;
}

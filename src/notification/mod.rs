//! Operator alerting on incident transitions.
//!
//! The engine invokes [`AlertSink`] callbacks after an incident transition
//! has been committed to the store. Delivery is best-effort: sink errors are
//! logged by the caller and never propagate back into the engine.

mod discord;
mod error;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

pub use discord::DiscordAlerter;
pub use error::NotificationError;

use crate::models::Incident;

/// Receives incident open/close events after they are committed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Called once per incident open.
    async fn incident_opened(&self, incident: &Incident) -> Result<(), NotificationError>;

    /// Called once per incident close.
    async fn incident_closed(&self, incident: &Incident) -> Result<(), NotificationError>;
}

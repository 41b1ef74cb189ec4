//! Error types for alert delivery.

use thiserror::Error;

/// Errors that can occur while delivering an alert.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The alert transport rejected the request or was unreachable.
    #[error("Failed to deliver notification: {0}")]
    NotifyFailed(String),

    /// The notifier was configured incorrectly.
    #[error("Invalid notifier configuration: {0}")]
    ConfigError(String),
}

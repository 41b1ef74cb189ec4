use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum stored length of `issue_type`.
pub const MAX_REPORT_ISSUE_TYPE: usize = 64;
/// Maximum stored length of `wallet`.
pub const MAX_REPORT_WALLET: usize = 128;
/// Maximum stored length of `device`.
pub const MAX_REPORT_DEVICE: usize = 64;
/// Maximum stored length of `region`.
pub const MAX_REPORT_REGION: usize = 64;
/// Maximum stored length of `description`.
pub const MAX_REPORT_DESCRIPTION: usize = 2048;
/// Maximum stored length of `url`.
pub const MAX_REPORT_URL: usize = 512;
/// Maximum stored length of `tx_hash`.
pub const MAX_REPORT_TX_HASH: usize = 128;
/// Maximum stored length of `user_agent`.
pub const MAX_REPORT_USER_AGENT: usize = 512;

/// A user-submitted report prior to persistence. All string fields are
/// truncated to their maxima before the row is written.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewReport {
    /// Free-form issue classification.
    pub issue_type: String,
    /// Reporting user's wallet address.
    #[serde(default)]
    pub wallet: String,
    /// Device description.
    #[serde(default)]
    pub device: String,
    /// Region description.
    #[serde(default)]
    pub region: String,
    /// Free-form problem description.
    #[serde(default)]
    pub description: String,
    /// URL where the problem was observed.
    #[serde(default)]
    pub url: String,
    /// Related transaction hash.
    #[serde(default)]
    pub tx_hash: String,
    /// Reporting client's user agent.
    #[serde(default)]
    pub user_agent: String,
    /// Optional weak reference to an incident. Not enforced on deletes.
    #[serde(default)]
    pub incident_id: Option<i64>,
}

/// A persisted user report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Row id.
    pub id: i64,
    /// Issue classification, truncated.
    pub issue_type: String,
    /// Wallet address, truncated.
    pub wallet: String,
    /// Device description, truncated.
    pub device: String,
    /// Region description, truncated.
    pub region: String,
    /// Problem description, truncated.
    pub description: String,
    /// Observed URL, truncated.
    pub url: String,
    /// Transaction hash, truncated.
    pub tx_hash: String,
    /// User agent, truncated.
    pub user_agent: String,
    /// Optional weak reference to an incident.
    pub incident_id: Option<i64>,
    /// When the report was submitted.
    pub created_at: DateTime<Utc>,
}

/// Truncates `s` to at most `max` bytes, backing off to the nearest character
/// boundary so multi-byte input never splits a code point.
pub fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

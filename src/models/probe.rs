use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a failed probe.
///
/// Exactly one category is assigned per failure; the variants are listed in
/// rule order — the first matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Deadline exceeded or transport-reported timeout.
    Timeout,
    /// DNS resolution failure.
    Dns,
    /// TLS handshake or certificate failure.
    Tls,
    /// Response status outside `[200, 400)`.
    HttpStatus,
    /// Response body was not a JSON object.
    JsonDecode,
    /// Any other transport or body-read failure.
    UnexpectedPayload,
}

impl ErrorCategory {
    /// The stable string form used in the `checks.error_category` column and
    /// in API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Dns => "dns",
            ErrorCategory::Tls => "tls",
            ErrorCategory::HttpStatus => "http_status",
            ErrorCategory::JsonDecode => "json_decode",
            ErrorCategory::UnexpectedPayload => "unexpected_payload",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the two-call fullnode probe.
///
/// The chain metadata fields are extracted best-effort from the node's
/// responses; their absence does not fail the probe.
#[derive(Debug, Clone, Default)]
pub struct RpcProbeOutcome {
    /// Whether both requests succeeded.
    pub success: bool,
    /// Wall-clock from the start of the first request to the end of the last
    /// observed response or failure.
    pub latency_ms: i64,
    /// Failure classification when `success` is false.
    pub error_category: Option<ErrorCategory>,
    /// `chain_id` from the root endpoint.
    pub chain_id: Option<i64>,
    /// `ledger_version` from `/v1/ledger_info`.
    pub ledger_version: Option<u64>,
    /// `block_height` from `/v1/ledger_info`.
    pub block_height: Option<u64>,
    /// `ledger_info.timestamp` from `/v1/ledger_info`, if present.
    pub ledger_timestamp: Option<String>,
}

/// Outcome of the generic HTTP reachability probe.
#[derive(Debug, Clone, Default)]
pub struct HttpProbeOutcome {
    /// Whether the response status was in `[200, 400)`.
    pub success: bool,
    /// Wall-clock latency of the request.
    pub latency_ms: i64,
    /// Response status, when a response was received at all.
    pub status: Option<u16>,
}

//! Two-call health probe against an Aptos fullnode.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::models::{ErrorCategory, RpcProbeOutcome};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Probes a fullnode by fetching `/v1` followed by `/v1/ledger_info`. Both
/// requests share one wall clock; both must succeed for the probe to count as
/// healthy.
#[derive(Debug, Clone)]
pub struct RpcProber {
    base_url: String,
    timeout: Duration,
}

impl RpcProber {
    /// Creates a prober for `base_url` (trailing slash stripped). A zero
    /// timeout falls back to the 4 s default.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        Self { base_url: base_url.trim_end_matches('/').to_string(), timeout }
    }

    /// Runs the probe and classifies any failure into exactly one category.
    pub async fn probe(&self) -> RpcProbeOutcome {
        let start = Instant::now();
        let mut outcome = RpcProbeOutcome::default();

        let client = match reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to build probe HTTP client.");
                outcome.error_category = Some(ErrorCategory::UnexpectedPayload);
                outcome.latency_ms = elapsed_ms(start);
                return outcome;
            }
        };

        let root = match self.fetch_json(&client, &format!("{}/v1", self.base_url)).await {
            Ok(value) => value,
            Err(category) => {
                outcome.error_category = Some(category);
                outcome.latency_ms = elapsed_ms(start);
                return outcome;
            }
        };
        outcome.chain_id = json_number(&root, "chain_id");

        let ledger =
            match self.fetch_json(&client, &format!("{}/v1/ledger_info", self.base_url)).await {
                Ok(value) => value,
                Err(category) => {
                    outcome.error_category = Some(category);
                    outcome.latency_ms = elapsed_ms(start);
                    return outcome;
                }
            };
        outcome.ledger_version = json_number(&ledger, "ledger_version").map(|v| v as u64);
        outcome.block_height = json_number(&ledger, "block_height").map(|v| v as u64);
        outcome.ledger_timestamp = ledger
            .get("ledger_info")
            .and_then(|info| info.get("timestamp"))
            .and_then(Value::as_str)
            .map(str::to_string);

        outcome.success = true;
        outcome.latency_ms = elapsed_ms(start);
        outcome
    }

    /// Fetches one URL and requires a JSON object body within [200, 400).
    async fn fetch_json(&self, client: &reqwest::Client, url: &str) -> Result<Value, ErrorCategory> {
        let response = client.get(url).send().await.map_err(|e| categorize_transport(&e))?;
        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return Err(ErrorCategory::HttpStatus);
        }
        let body = response.text().await.map_err(|e| categorize_body_read(&e))?;
        match serde_json::from_str::<Value>(&body) {
            Ok(value) if value.is_object() => Ok(value),
            _ => Err(ErrorCategory::JsonDecode),
        }
    }
}

fn elapsed_ms(start: Instant) -> i64 {
    start.elapsed().as_millis() as i64
}

/// Reads a numeric JSON field. String-encoded numbers are deliberately not
/// coerced; the field is simply absent from the outcome.
fn json_number(value: &Value, key: &str) -> Option<i64> {
    let v = value.get(key)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// Classifies a transport-level failure. Timeout is checked before the
/// message scan so a timed-out TLS handshake still reads as a timeout.
fn categorize_transport(err: &reqwest::Error) -> ErrorCategory {
    if err.is_timeout() {
        return ErrorCategory::Timeout;
    }
    categorize_error_text(&error_chain_text(err))
}

/// Body-read failures are `unexpected_payload` unless the transport reported
/// a timeout mid-read.
fn categorize_body_read(err: &reqwest::Error) -> ErrorCategory {
    if err.is_timeout() {
        return ErrorCategory::Timeout;
    }
    match categorize_error_text(&error_chain_text(err)) {
        ErrorCategory::Timeout => ErrorCategory::Timeout,
        _ => ErrorCategory::UnexpectedPayload,
    }
}

fn error_chain_text(err: &reqwest::Error) -> String {
    let mut text = String::new();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        text.push_str(&e.to_string().to_lowercase());
        text.push(' ');
        source = e.source();
    }
    text
}

/// First-match classification over the lowercased error chain: timeout, then
/// dns, then tls; anything else is an unexpected payload.
fn categorize_error_text(text: &str) -> ErrorCategory {
    if text.contains("timed out") || text.contains("timeout") || text.contains("deadline") {
        ErrorCategory::Timeout
    } else if text.contains("dns") || text.contains("failed to lookup address") {
        ErrorCategory::Dns
    } else if text.contains("tls") || text.contains("certificate") || text.contains("handshake") {
        ErrorCategory::Tls
    } else {
        ErrorCategory::UnexpectedPayload
    }
}

//! Generic HTTP reachability probe for dApp URLs.

use std::time::{Duration, Instant};

use crate::models::HttpProbeOutcome;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Probes a URL with a single GET. Success iff the status is in [200, 400);
/// the body is drained and discarded.
#[derive(Debug, Clone)]
pub struct HttpProber {
    url: String,
    timeout: Duration,
}

impl HttpProber {
    /// Creates a prober for `url`. A zero timeout falls back to the 4 s
    /// default.
    pub fn new(url: &str, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        Self { url: url.to_string(), timeout }
    }

    /// Runs the probe.
    pub async fn probe(&self) -> HttpProbeOutcome {
        let start = Instant::now();
        let mut outcome = HttpProbeOutcome::default();

        let client = match reqwest::Client::builder().timeout(self.timeout).build() {
            Ok(client) => client,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to build probe HTTP client.");
                outcome.latency_ms = start.elapsed().as_millis() as i64;
                return outcome;
            }
        };

        let response = match client.get(&self.url).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(url = %self.url, error = %err, "HTTP probe failed.");
                outcome.latency_ms = start.elapsed().as_millis() as i64;
                return outcome;
            }
        };

        let status = response.status().as_u16();
        let _ = response.bytes().await;
        outcome.latency_ms = start.elapsed().as_millis() as i64;
        outcome.status = Some(status);
        outcome.success = (200..400).contains(&status);
        outcome
    }
}

//! Prometheus metrics exposed at the configured metrics path.

use prometheus::{Encoder, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur while registering or encoding metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A collector could not be created or registered.
    #[error("Failed to register metric: {0}")]
    Register(#[from] prometheus::Error),

    /// The registry could not be encoded to text.
    #[error("Failed to encode metrics: {0}")]
    Encode(String),
}

/// The application's metric registry.
pub struct GuardianMetrics {
    registry: Registry,
    check_success: IntGaugeVec,
    latency_ms: IntGaugeVec,
    incidents_open: IntGauge,
    reports_total: IntCounter,
    build_info: IntGaugeVec,
}

impl GuardianMetrics {
    /// Creates and registers all collectors.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let check_success = IntGaugeVec::new(
            Opts::new("aptos_guardian_check_success", "1 if last check succeeded, 0 otherwise"),
            &["entity_type", "name"],
        )?;
        registry.register(Box::new(check_success.clone()))?;

        let latency_ms = IntGaugeVec::new(
            Opts::new("aptos_guardian_latency_ms", "Last check latency in milliseconds"),
            &["entity_type", "name"],
        )?;
        registry.register(Box::new(latency_ms.clone()))?;

        let incidents_open =
            IntGauge::new("aptos_guardian_incidents_open", "Number of open incidents")?;
        registry.register(Box::new(incidents_open.clone()))?;

        let reports_total = IntCounter::new(
            "aptos_guardian_reports_total",
            "Total number of user reports submitted",
        )?;
        registry.register(Box::new(reports_total.clone()))?;

        let build_info = IntGaugeVec::new(
            Opts::new("aptos_guardian_build_info", "Build and version info"),
            &["version", "commit", "date"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self { registry, check_success, latency_ms, incidents_open, reports_total, build_info })
    }

    /// Records the outcome of one probe for the labeled entity.
    pub fn record_check(&self, entity_type: &str, name: &str, success: bool, latency_ms: i64) {
        self.check_success
            .with_label_values(&[entity_type, name])
            .set(if success { 1 } else { 0 });
        self.latency_ms.with_label_values(&[entity_type, name]).set(latency_ms);
    }

    /// Sets the open-incident gauge.
    pub fn set_incidents_open(&self, count: i64) {
        self.incidents_open.set(count);
    }

    /// Increments the submitted-reports counter.
    pub fn inc_reports_total(&self) {
        self.reports_total.inc();
    }

    /// Sets the build-info gauge to 1 for the given label set.
    pub fn set_build_info(&self, version: &str, commit: &str, date: &str) {
        self.build_info.with_label_values(&[version, commit, date]).set(1);
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_encodes_check_gauges() {
        let metrics = GuardianMetrics::new().unwrap();
        metrics.record_check("rpc", "aptoslabs", true, 42);
        metrics.record_check("dapp", "explorer", false, 0);
        metrics.set_incidents_open(2);
        metrics.inc_reports_total();
        metrics.set_build_info("0.1.0", "abc123", "2024-06-01");

        let text = metrics.encode().unwrap();
        assert!(text.contains(
            "aptos_guardian_check_success{entity_type=\"rpc\",name=\"aptoslabs\"} 1"
        ));
        assert!(text.contains(
            "aptos_guardian_check_success{entity_type=\"dapp\",name=\"explorer\"} 0"
        ));
        assert!(text.contains("aptos_guardian_latency_ms{entity_type=\"rpc\",name=\"aptoslabs\"} 42"));
        assert!(text.contains("aptos_guardian_incidents_open 2"));
        assert!(text.contains("aptos_guardian_reports_total 1"));
        assert!(text.contains("aptos_guardian_build_info"));
    }

    #[test]
    fn failure_overwrites_success_gauge() {
        let metrics = GuardianMetrics::new().unwrap();
        metrics.record_check("rpc", "x", true, 10);
        metrics.record_check("rpc", "x", false, 0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("aptos_guardian_check_success{entity_type=\"rpc\",name=\"x\"} 0"));
    }
}

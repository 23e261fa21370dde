//! Metrics collection and exposition.
//!
//! # Metrics
//! - `access_filter_requests_total` (counter): requests by method, status
//! - `access_filter_duration_seconds` (histogram): filter latency
//! - `access_filter_verdicts_total` (counter): agent verdicts by name
//! - `access_filter_failures_total` (counter): filter failures by kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one filtered request. `status` is `None` when the filter declined.
pub fn record_request(method: &str, status: Option<u16>, start: Instant) {
    let status = status.map_or_else(|| "declined".to_string(), |s| s.to_string());
    counter!("access_filter_requests_total", "method" => method.to_string(), "status" => status).increment(1);
    histogram!("access_filter_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_verdict(verdict: &'static str) {
    counter!("access_filter_verdicts_total", "verdict" => verdict).increment(1);
}

pub fn record_failure(kind: &'static str) {
    counter!("access_filter_failures_total", "kind" => kind).increment(1);
}

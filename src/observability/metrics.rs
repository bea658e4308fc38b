//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ig_proxy_requests_total` (counter): proxy responses by status
//! - `ig_proxy_fetch_duration_seconds` (histogram): upstream fetch latency
//! - `ig_proxy_transform_total` (counter): resized vs passed through
//! - `ig_media_fetch_total` (counter): Graph API media loads by outcome
//!
//! Without an installed recorder every call is a no-op, so tests and the CLI
//! pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_proxy_response(status: u16) {
    counter!("ig_proxy_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_fetch(outcome: &'static str, start: Instant) {
    histogram!("ig_proxy_fetch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_transform(outcome: &'static str) {
    counter!("ig_proxy_transform_total", "outcome" => outcome).increment(1);
}

pub fn record_media_fetch(outcome: &'static str) {
    counter!("ig_media_fetch_total", "outcome" => outcome).increment(1);
}

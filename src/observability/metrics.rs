//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define resolver metrics (resolutions by stage, content lookups, HTTP requests)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `resolver_resolutions_total` (counter): resolutions by stage, outcome
//! - `resolver_content_lookups_total` (counter): content lookups by result
//! - `resolver_requests_total` (counter): HTTP requests by method, status
//! - `resolver_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op, so library users and
//!   tests pay nothing
//! - Labels are low-cardinality: never the path or handler

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one resolution attempt.
pub fn record_resolution(stage: &'static str, outcome: &'static str) {
    metrics::counter!("resolver_resolutions_total", "stage" => stage, "outcome" => outcome)
        .increment(1);
}

/// Count one content lookup against the content collaborator.
pub fn record_content_lookup(found: bool) {
    let result = if found { "hit" } else { "miss" };
    metrics::counter!("resolver_content_lookups_total", "result" => result).increment(1);
}

/// Count one served HTTP request and its latency.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "resolver_requests_total",
        "method" => method.clone(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "resolver_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

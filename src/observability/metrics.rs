//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server metrics (request volume, latency, render cache)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `waypost_requests_total` (counter): requests by route, method, status
//! - `waypost_request_duration_seconds` (histogram): latency by route
//! - `waypost_template_cache_total` (counter): compiled-template lookups
//!   by result (`hit`/`miss`)
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so the library
//!   never forces the exporter on embedders

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
///
/// Failure to install is logged, not fatal; the server works without
/// metrics exposition.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(route: &str, method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "waypost_requests_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "waypost_request_duration_seconds",
        "route" => route.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}

/// Record a compiled-template cache lookup.
pub fn record_template_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("waypost_template_cache_total", "result" => result).increment(1);
}

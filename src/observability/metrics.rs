//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (requests, latency, failovers, pool health)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_requests_total` (counter): total requests by method, status
//! - `router_request_duration_seconds` (histogram): latency distribution
//! - `router_active_connections` (gauge): current connection count
//! - `router_upstream_failures_total` (counter): transport failures by pool, port
//! - `router_backend_healthy` (gauge): healthy backends per pool
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Labels are bounded: method, status code, pool name, port

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "router_requests_total";
pub const REQUEST_DURATION: &str = "router_request_duration_seconds";
pub const ACTIVE_CONNECTIONS: &str = "router_active_connections";
pub const UPSTREAM_FAILURES: &str = "router_upstream_failures_total";
pub const BACKEND_HEALTHY: &str = "router_backend_healthy";

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!(REQUESTS_TOTAL, "Requests answered, by method and status");
    ::metrics::describe_histogram!(
        REQUEST_DURATION,
        ::metrics::Unit::Seconds,
        "Time from accept to response written"
    );
    ::metrics::describe_gauge!(ACTIVE_CONNECTIONS, "Open client connections");
    ::metrics::describe_counter!(
        UPSTREAM_FAILURES,
        "Transport failures that took a backend out of rotation"
    );
    ::metrics::describe_gauge!(BACKEND_HEALTHY, "Healthy backends after the last refresh");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, started: Instant) {
    ::metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());
}

pub fn record_active_connections(count: u64) {
    ::metrics::gauge!(ACTIVE_CONNECTIONS).set(count as f64);
}

pub fn record_upstream_failure(pool: &str, port: u16) {
    ::metrics::counter!(
        UPSTREAM_FAILURES,
        "pool" => pool.to_string(),
        "port" => port.to_string()
    )
    .increment(1);
}

pub fn record_pool_health(pool: &str, healthy: usize) {
    ::metrics::gauge!(BACKEND_HEALTHY, "pool" => pool.to_string()).set(healthy as f64);
}

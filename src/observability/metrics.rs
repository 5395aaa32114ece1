//! Metrics collection and exposition.
//!
//! # Metrics
//! - `testbed_requests_total` (counter): requests by route, status
//! - `testbed_payload_bytes_total` (counter): synthetic payload bytes promised
//! - `testbed_active_connections` (gauge): open QUIC connections
//! - `testbed_traces_created_total` (counter): qlog files opened

use std::net::SocketAddr;

use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(route: &'static str, status: StatusCode) {
    ::metrics::counter!(
        "testbed_requests_total",
        "route" => route,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

pub fn record_payload_bytes(len: u64) {
    ::metrics::counter!("testbed_payload_bytes_total").increment(len);
}

pub fn record_trace_created() {
    ::metrics::counter!("testbed_traces_created_total").increment(1);
}

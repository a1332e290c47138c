//! Metrics collection and exposition.
//!
//! # Metrics
//! - `deadswitch_connections_total` (counter): accepted reset connections
//! - `deadswitch_resets_total` (counter): reset attempts by outcome
//! - `deadswitch_protocol_errors_total` (counter): rejected commands by kind
//! - `deadswitch_capability_failures_total` (counter): failures by phase
//! - `deadswitch_engine_runs_total` (counter): triggered runs by outcome

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection() {
    metrics::counter!("deadswitch_connections_total").increment(1);
}

pub fn record_reset(outcome: &'static str) {
    metrics::counter!("deadswitch_resets_total", "outcome" => outcome).increment(1);
}

pub fn record_protocol_error(kind: &'static str) {
    metrics::counter!("deadswitch_protocol_errors_total", "kind" => kind).increment(1);
}

pub fn record_capability_failure(phase: &'static str) {
    metrics::counter!("deadswitch_capability_failures_total", "phase" => phase).increment(1);
}

pub fn record_engine_run(outcome: &'static str) {
    metrics::counter!("deadswitch_engine_runs_total", "outcome" => outcome).increment(1);
}

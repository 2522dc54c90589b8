//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_exchanges_total` (counter): exchanges by outcome
//! - `bridge_exchange_duration_seconds` (histogram): bridge latency by outcome
//! - `bridge_request_body_spills_total` (counter): bodies moved to temp files
//!
//! Outcomes are `applied`, `pass_through` and `error`.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished exchange.
pub fn record_exchange(outcome: &'static str, start: Instant) {
    ::metrics::counter!("bridge_exchanges_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("bridge_exchange_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request body moving from memory to a temp file.
pub fn record_body_spill() {
    ::metrics::counter!("bridge_request_body_spills_total").increment(1);
}

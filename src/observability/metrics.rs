//! Metrics collection and exposition.
//!
//! # Metrics
//! - `circuit_breaker_requests_total` (counter): completed calls by breaker, outcome
//! - `circuit_breaker_response_seconds` (histogram): operation latency
//! - `circuit_breaker_rejected_total` (counter): short-circuited calls by breaker, fallback
//! - `circuit_breaker_trips_total` (counter): transitions into OPEN
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exposition is opt-in via config

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::types::CircuitState;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed call.
pub fn record_call(breaker: &str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "circuit_breaker_requests_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("circuit_breaker_response_seconds", "breaker" => breaker.to_string())
        .record(elapsed.as_secs_f64());
}

/// Record a short-circuited call.
pub fn record_rejection(breaker: &str, fallback: bool) {
    counter!(
        "circuit_breaker_rejected_total",
        "breaker" => breaker.to_string(),
        "fallback" => if fallback { "true" } else { "false" }
    )
    .increment(1);
}

pub fn record_trip(breaker: &str) {
    counter!("circuit_breaker_trips_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_state(breaker: &str, state: CircuitState) {
    gauge!("circuit_breaker_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}

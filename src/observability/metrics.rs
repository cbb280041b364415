//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hydrate_requests_total` (counter): requests by method, status
//! - `hydrate_request_duration_seconds` (histogram): latency distribution
//! - `hydrate_bundle_cache_hits_total` / `hydrate_bundle_cache_misses_total` (counters)
//! - `hydrate_bundle_builds_total` (counter): builds by outcome (ok, empty, error)
//! - `hydrate_bundle_cache_entries` (gauge): cached bundle count
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests that never call [`init_metrics`] pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "hydrate_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("hydrate_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_hit() {
    ::metrics::counter!("hydrate_bundle_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    ::metrics::counter!("hydrate_bundle_cache_misses_total").increment(1);
}

/// `outcome` is one of "ok", "empty" or "error".
pub fn record_build(outcome: &'static str) {
    ::metrics::counter!("hydrate_bundle_builds_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_size(entries: usize) {
    ::metrics::gauge!("hydrate_bundle_cache_entries").set(entries as f64);
}

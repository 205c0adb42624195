//! Metrics collection and exposition.
//!
//! # Metrics
//! - `smart_proxy_requests_total` (counter): requests by method, status, target
//! - `smart_proxy_request_duration_seconds` (histogram): latency distribution
//! - `smart_proxy_upstream_errors_total` (counter): failed backend calls by
//!   backend and kind (`connect`, `timeout`)
//!
//! The exposition handler is the Prometheus recorder's own rendering; the
//! gateway only mounts it under the API prefix.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const REQUESTS_TOTAL: &str = "smart_proxy_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "smart_proxy_request_duration_seconds";
pub const UPSTREAM_ERRORS_TOTAL: &str = "smart_proxy_upstream_errors_total";

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests handled by the gateway");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Request handling duration in seconds");
    describe_counter!(UPSTREAM_ERRORS_TOTAL, "Total number of failed backend calls");
}

/// Record a handled request.
pub fn record_request(method: &str, status: u16, target: &str, start: Instant) {
    counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string(),
        "target" => target.to_string()
    )
    .increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "target" => target.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a backend call that produced no response.
pub fn record_upstream_error(backend: &'static str, kind: &'static str) {
    counter!(UPSTREAM_ERRORS_TOTAL, "backend" => backend, "kind" => kind).increment(1);
}

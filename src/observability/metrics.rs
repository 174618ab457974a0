//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (requests, latency, connections, lifecycle)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, path, status
//! - `http_requests_duration_seconds` (histogram): latency distribution
//! - `server_active_connections` (gauge): current connection count
//! - `lifecycle_phase_transitions_total` (counter): phase entered
//! - `lifecycle_startup_failed_total` (counter): bind failures
//! - `lifecycle_shutdown_initiated_total` (counter): shutdowns by trigger
//! - `lifecycle_shutdown_completed_total` (counter): shutdowns by `clean`
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Histogram buckets tuned for typical web latencies

use std::sync::OnceLock;
use std::time::Instant;

use axum::{
    body::Body, extract::MatchedPath, http::Request, middleware::Next, response::IntoResponse,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
pub const METRIC_HTTP_DURATION: &str = "http_requests_duration_seconds";
pub const METRIC_ACTIVE_CONNECTIONS: &str = "server_active_connections";
pub const METRIC_PHASE_TRANSITIONS: &str = "lifecycle_phase_transitions_total";
pub const METRIC_STARTUP_FAILED: &str = "lifecycle_startup_failed_total";
pub const METRIC_SHUTDOWN_INITIATED: &str = "lifecycle_shutdown_initiated_total";
pub const METRIC_SHUTDOWN_COMPLETED: &str = "lifecycle_shutdown_completed_total";

const EXPONENTIAL_SECONDS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder, or return the one already installed.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = RECORDER.get() {
        return Ok(handle.clone());
    }

    match PrometheusBuilder::new()
        .set_buckets(EXPONENTIAL_SECONDS)?
        .install_recorder()
    {
        Ok(handle) => Ok(RECORDER.get_or_init(|| handle).clone()),
        // Lost an install race against another caller.
        Err(e) => RECORDER.get().cloned().ok_or(e),
    }
}

/// Middleware to record request count and latency.
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };

    let method = req.method().clone();

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    metrics::counter!(METRIC_HTTP_REQUESTS, &labels).increment(1);
    metrics::histogram!(METRIC_HTTP_DURATION, &labels).record(latency);

    response
}

pub fn set_active_connections(count: u64) {
    metrics::gauge!(METRIC_ACTIVE_CONNECTIONS).set(count as f64);
}

pub fn emit_phase_transition(service_name: &str, phase: &str) {
    metrics::counter!(
        METRIC_PHASE_TRANSITIONS,
        "service_name" => service_name.to_string(),
        "phase" => phase.to_string()
    )
    .increment(1);
}

pub fn emit_startup_failed(service_name: &str) {
    metrics::counter!(
        METRIC_STARTUP_FAILED,
        "service_name" => service_name.to_string()
    )
    .increment(1);
}

pub fn emit_shutdown_initiated(service_name: &str, trigger: &str) {
    metrics::counter!(
        METRIC_SHUTDOWN_INITIATED,
        "service_name" => service_name.to_string(),
        "trigger" => trigger.to_string()
    )
    .increment(1);
}

pub fn emit_shutdown_completed(service_name: &str, clean: bool) {
    metrics::counter!(
        METRIC_SHUTDOWN_COMPLETED,
        "service_name" => service_name.to_string(),
        "clean" => clean.to_string()
    )
    .increment(1);
}

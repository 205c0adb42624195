//! Runtime introspection endpoints under `/debug/pprof/`. Debug mode only.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::routing::endpoints::{PROFILING_CMDLINE_ENDPOINT, PROFILING_RUNTIME_ENDPOINT};
use crate::routing::make_url_to_endpoint;

/// Links to the other introspection endpoints.
pub fn index() -> Response {
    let endpoints: Vec<String> = [PROFILING_CMDLINE_ENDPOINT, PROFILING_RUNTIME_ENDPOINT]
        .into_iter()
        .filter_map(|endpoint| make_url_to_endpoint("/", endpoint, &[]).ok())
        .collect();

    Json(json!({ "endpoints": endpoints })).into_response()
}

/// Command line of the running process.
pub fn cmdline() -> Response {
    let args: Vec<String> = std::env::args().collect();
    Json(json!({ "args": args })).into_response()
}

/// Tokio runtime metrics for the current runtime.
pub fn runtime() -> Response {
    let metrics = tokio::runtime::Handle::current().metrics();
    Json(json!({
        "workers": metrics.num_workers(),
        "alive_tasks": metrics.num_alive_tasks(),
        "global_queue_depth": metrics.global_queue_depth(),
    }))
    .into_response()
}

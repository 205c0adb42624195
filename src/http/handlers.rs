//! Handlers served by the gateway without forwarding.

use std::io::ErrorKind;
use std::path::Path;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;

use crate::http::response::error_response;

/// Liveness: `{"status":"ok"}`.
pub fn main_endpoint() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// Prometheus text exposition from the installed recorder.
pub fn metrics_endpoint(handle: &PrometheusHandle) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}

/// The OpenAPI specification file, served as is.
pub async fn api_spec_endpoint(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(content) => ([(header::CONTENT_TYPE, "application/json")], content).into_response(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "API spec file not found");
            error_response(StatusCode::NOT_FOUND, "API spec file not found")
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Unable to read API spec file");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Unable to read API spec file")
        }
    }
}

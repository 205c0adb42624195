//! Response helpers.
//!
//! # Responsibilities
//! - Build diagnostic bodies for responses produced by the gateway itself
//! - Strip hop-by-hop headers when relaying messages
//!
//! # Design Decisions
//! - Gateway-generated bodies are JSON `{"status": "..."}`
//! - Backend failures map to 502, backend timeouts to 504

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Headers meaningful only for a single transport-level connection.
const HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// A JSON diagnostic response.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "status": message.into() }))).into_response()
}

/// 405 with the `Allow` header listing the methods the path accepts.
pub fn method_not_allowed(allowed: &[Method]) -> Response {
    let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

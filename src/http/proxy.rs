//! Request forwarding to backend services.
//!
//! # Responsibilities
//! - Rewrite the inbound path into the backend path for the matched route
//! - Relay method, query, headers and body to the backend
//! - Stream the backend response back unchanged
//! - Map transport failures to 502 and timeouts to 504
//!
//! # Design Decisions
//! - Exactly one backend call per request (no retries, no caching)
//! - Bodies are streamed in both directions, never buffered
//! - The backend call lives inside the inbound request future, so a client
//!   disconnect drops it

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode, Uri};
use axum::response::Response;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::http::request::request_id;
use crate::http::response::{error_response, strip_hop_by_hop};
use crate::observability::metrics;
use crate::routing::{BackendTarget, PathParams, Route};

/// Shared HTTP client used for every backend call. Speaks `http` and `https`.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Factory of per-backend proxy handlers.
#[derive(Clone)]
pub struct ProxyForwarder {
    client: HttpClient,
    upstream_timeout: Duration,
}

impl ProxyForwarder {
    /// Build the client. TLS backends are verified against the webpki roots.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, rustls::Error> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let provider = rustls::crypto::aws_lc_rs::default_provider();
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)?
            .https_or_http()
            .enable_all_versions()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
        })
    }

    /// Handler relaying requests to `backend`.
    pub fn proxy_to(&self, backend: Arc<BackendTarget>) -> ProxyHandler {
        ProxyHandler {
            client: self.client.clone(),
            backend,
            upstream_timeout: self.upstream_timeout,
        }
    }
}

/// Relays requests to one backend.
#[derive(Clone)]
pub struct ProxyHandler {
    client: HttpClient,
    backend: Arc<BackendTarget>,
    upstream_timeout: Duration,
}

impl ProxyHandler {
    pub fn backend(&self) -> &BackendTarget {
        &self.backend
    }

    /// Forward `request`, matched to `route` with `params`, and return the
    /// backend's response.
    pub async fn forward(&self, route: &Route, params: &PathParams, request: Request<Body>) -> Response {
        let backend = self.backend.name();
        let (parts, body) = request.into_parts();
        let request_id = request_id(&parts.headers).to_string();

        let backend_path = match route.backend_path(params) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!(request_id = %request_id, backend, error = %e, "Backend path rendering failed");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid backend path");
            }
        };

        let uri = match self
            .backend
            .url_for(&backend_path, parts.uri.query())
            .map_err(|e| e.to_string())
            .and_then(|url| url.as_str().parse::<Uri>().map_err(|e| e.to_string()))
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(request_id = %request_id, backend, path = %backend_path, error = %e, "Backend URL is invalid");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid backend URL");
            }
        };

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method.clone();
        *outbound.uri_mut() = uri.clone();
        *outbound.headers_mut() = parts.headers;
        strip_hop_by_hop(outbound.headers_mut());
        // Derived by the client from the target URI.
        outbound.headers_mut().remove(header::HOST);

        tracing::debug!(
            request_id = %request_id,
            method = %parts.method,
            backend,
            uri = %uri,
            "Forwarding request"
        );

        match tokio::time::timeout(self.upstream_timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, backend, uri = %uri, error = %e, "Upstream error");
                metrics::record_upstream_error(backend, "connect");
                error_response(
                    StatusCode::BAD_GATEWAY,
                    format!("Upstream request to {backend} failed"),
                )
            }
            Err(_) => {
                tracing::error!(
                    request_id = %request_id,
                    backend,
                    uri = %uri,
                    timeout_secs = self.upstream_timeout.as_secs(),
                    "Upstream timeout"
                );
                metrics::record_upstream_error(backend, "timeout");
                error_response(
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("Upstream request to {backend} timed out"),
                )
            }
        }
    }
}

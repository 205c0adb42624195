//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the route table once at construction
//! - Create the Axum Router with a single dispatch handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Dispatch matched requests to local handlers or the proxy forwarder
//! - Serve until the shutdown coordinator fires

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::http::handlers;
use crate::http::profiling;
use crate::http::proxy::ProxyForwarder;
use crate::http::request::{request_id, RequestIdLayer};
use crate::http::response::{error_response, method_not_allowed};
use crate::observability::metrics;
use crate::routing::{
    BackendTargets, LocalHandler, Resolution, RouteTable, RouteTableError, Target,
};

/// Errors that prevent the server from being built.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Routes(#[from] RouteTableError),

    #[error("backend TLS setup: {0}")]
    Tls(#[from] rustls::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub forwarder: ProxyForwarder,
    pub metrics: PrometheusHandle,
    pub api_spec_file: Arc<PathBuf>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    routes: Arc<RouteTable>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails when the route table cannot be built; the server must not start
    /// with ambiguous or malformed routes.
    pub fn new(config: ProxyConfig, metrics: PrometheusHandle) -> Result<Self, ServerError> {
        let backends = BackendTargets::from_config(&config.services)?;
        let routes = Arc::new(RouteTable::build(&config.server, &backends)?);

        tracing::info!(
            routes = routes.len(),
            debug = config.server.debug,
            api_prefix = %config.server.api_prefix,
            aggregator = %backends.aggregator.base_url,
            content = %backends.content.base_url,
            "Route table built"
        );

        let state = AppState {
            routes: routes.clone(),
            forwarder: ProxyForwarder::new(&config.timeouts)?,
            metrics,
            api_spec_file: Arc::new(PathBuf::from(&config.server.api_spec_file)),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            routes,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Get a reference to the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

/// Dispatch handler.
/// Looks up the route and serves it locally or forwards it to its backend.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let (response, target) = match state.routes.resolve(&method, &path) {
        Resolution::NotFound => {
            tracing::debug!(request_id = %request_id, method = %method, path = %path, "No route matched");
            (error_response(StatusCode::NOT_FOUND, "Not found"), "none")
        }
        Resolution::MethodNotAllowed { allowed } => {
            tracing::debug!(request_id = %request_id, method = %method, path = %path, "Method not allowed");
            (method_not_allowed(&allowed), "none")
        }
        Resolution::Matched { route, params } => match &route.target {
            Target::Local(handler) => (serve_local(&state, *handler).await, "local"),
            Target::Proxied(backend) => {
                let response = state
                    .forwarder
                    .proxy_to(backend.clone())
                    .forward(route, &params, request)
                    .await;
                (response, backend.name())
            }
        },
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), target, start_time);
    response
}

async fn serve_local(state: &AppState, handler: LocalHandler) -> Response {
    match handler {
        LocalHandler::Main => handlers::main_endpoint(),
        LocalHandler::Metrics => handlers::metrics_endpoint(&state.metrics),
        LocalHandler::ApiSpec => handlers::api_spec_endpoint(&state.api_spec_file).await,
        LocalHandler::ProfilingIndex => profiling::index(),
        LocalHandler::ProfilingCmdline => profiling::cmdline(),
        LocalHandler::ProfilingRuntime => profiling::runtime(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Method};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    // Backends point at a closed port, so any forwarded request fails with 502.
    fn config(debug: bool) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.server.debug = debug;
        config.services.aggregator = "http://127.0.0.1:9/api/v1/".into();
        config.services.content = "http://127.0.0.1:9/api/v1/".into();
        config.timeouts.upstream_secs = 2;
        config
    }

    fn router(debug: bool) -> Router {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        HttpServer::new(config(debug), handle).unwrap().into_router()
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_main_endpoint() {
        let response = router(false).oneshot(request(Method::GET, "/api/v1/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_metrics_served_locally() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        ::metrics::with_local_recorder(&recorder, || {
            ::metrics::counter!("smart_proxy_test_total").increment(3);
        });
        let router = HttpServer::new(config(false), handle).unwrap().into_router();

        let response = router.oneshot(request(Method::GET, "/api/v1/metrics")).await.unwrap();
        // A forwarded request would have failed with 502.
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
        assert!(body_string(response).await.contains("smart_proxy_test_total 3"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let response = router(false).oneshot(request(Method::GET, "/api/v2/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_debug_route_hidden_without_debug() {
        let response = router(false)
            .oneshot(request(Method::DELETE, "/api/v1/organizations/org1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router(false).oneshot(request(Method::GET, "/debug/pprof/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_debug_route_forwarded_with_debug() {
        let response = router(true)
            .oneshot(request(Method::DELETE, "/api/v1/organizations/org1"))
            .await
            .unwrap();
        // Routed to the (unreachable) aggregator.
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_profiling_endpoints() {
        let response = router(true).oneshot(request(Method::GET, "/debug/pprof/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("/debug/pprof/runtime"));

        let response = router(true).oneshot(request(Method::GET, "/debug/pprof/runtime")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("workers"));
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let response = router(false).oneshot(request(Method::POST, "/api/v1/groups")).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, OPTIONS");
    }

    #[tokio::test]
    async fn test_missing_spec_file() {
        let mut config = config(false);
        config.server.api_spec_file = "/nonexistent/openapi.json".into();
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let router = HttpServer::new(config, handle).unwrap().into_router();

        let response = router.oneshot(request(Method::GET, "/api/v1/openapi.json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_backend_refuses_to_start() {
        let mut config = config(false);
        config.services.content = "::".into();
        let handle = PrometheusBuilder::new().build_recorder().handle();
        assert!(matches!(
            HttpServer::new(config, handle),
            Err(ServerError::Routes(RouteTableError::InvalidBackend { .. }))
        ));
    }

    #[test]
    fn test_server_exposes_config_and_routes() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let server = HttpServer::new(config(true), handle).unwrap();
        assert!(server.config().server.debug);
        assert_eq!(server.routes().len(), 21);
    }

    #[tokio::test]
    async fn test_encoded_dot_segments_not_forwarded() {
        // Would reach the debug-only `organizations` endpoint if resolved.
        let response = router(false)
            .oneshot(request(Method::GET, "/api/v1/report/%2e%2e/organizations"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use smart_proxy::{HttpServer, ProxyConfig, Shutdown};
use tokio::net::TcpListener;

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Captured {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Requests received by a mock backend, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Captured>>>);

#[allow(dead_code)]
impl Recorder {
    pub fn requests(&self) -> Vec<Captured> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

/// Start a backend that records every request and answers with a fixed
/// status, body and `x-backend` header.
pub async fn start_recording_backend(status: StatusCode, body: &'static str) -> (SocketAddr, Recorder) {
    start_programmable_backend(move |_| async move {
        (status, [("x-backend", "mock")], body).into_response()
    })
    .await
}

/// Start a backend answering with `f(captured_request)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Recorder)
where
    F: Fn(Captured) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = Response> + Send + 'static,
{
    let recorder = Recorder::default();
    let log = recorder.clone();

    let app = Router::new().fallback(move |request: Request<Body>| {
        let f = f.clone();
        let log = log.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
            let captured = Captured {
                method: parts.method,
                path_and_query: parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.to_string())
                    .unwrap_or_default(),
                headers: parts.headers,
                body,
            };
            log.0.lock().unwrap().push(captured.clone());
            f(captured).await
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, recorder)
}

/// Gateway config forwarding both services to the given addresses.
#[allow(dead_code)]
pub fn proxy_config(aggregator: SocketAddr, content: SocketAddr, debug: bool) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.server.debug = debug;
    config.services.aggregator = format!("http://{aggregator}/api/v1/");
    config.services.content = format!("http://{content}/api/v1");
    config.timeouts.upstream_secs = 2;
    config
}

/// Start the gateway on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let server = HttpServer::new(config, handle).expect("route table");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

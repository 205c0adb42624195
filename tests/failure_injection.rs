//! Failure injection tests for the gateway.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::response::IntoResponse;

mod common;

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    // Bind and drop to get a port nobody listens on.
    let dead = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (content, content_log) = common::start_recording_backend(StatusCode::OK, "groups").await;
    let (proxy, shutdown) = common::start_proxy(common::proxy_config(dead, content, false)).await;
    let client = common::client();

    let res = client
        .get(format!("http://{proxy}/api/v1/report/org1/cluster1"))
        .send()
        .await
        .expect("Proxy unreachable");
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["status"].as_str().unwrap().contains("aggregator"));

    // Still serving.
    let res = client.get(format!("http://{proxy}/api/v1/groups")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_log.count(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_backend_is_gateway_timeout() {
    let (aggregator, log) = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late".into_response()
    })
    .await;
    let mut config = common::proxy_config(aggregator, aggregator, false);
    config.timeouts.upstream_secs = 1;
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{proxy}/api/v1/organizations/1/clusters"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(log.count(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let (aggregator, log) =
        common::start_recording_backend(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").await;
    let (proxy, shutdown) = common::start_proxy(common::proxy_config(aggregator, aggregator, false)).await;

    let res = common::client()
        .put(format!("http://{proxy}/api/v1/clusters/c1/rules/r1/disable"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(res.text().await.unwrap(), "Service Unavailable");
    assert_eq!(log.count(), 1, "exactly one backend call per request");

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_timeout_is_gateway_timeout() {
    let (aggregator, _log) = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late".into_response()
    })
    .await;
    let mut config = common::proxy_config(aggregator, aggregator, false);
    config.timeouts.request_secs = 1;
    config.timeouts.upstream_secs = 10;
    let (proxy, shutdown) = common::start_proxy(config).await;

    let res = common::client()
        .get(format!("http://{proxy}/api/v1/report/org1/cluster1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);

    shutdown.trigger();
}

/// Sends its message when dropped.
struct DropSignal(tokio::sync::mpsc::UnboundedSender<Instant>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        let _ = self.0.send(Instant::now());
    }
}

#[tokio::test]
async fn test_client_disconnect_cancels_backend_call() {
    let (started_tx, mut started_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    let (dropped_tx, mut dropped_rx) = tokio::sync::mpsc::unbounded_channel::<Instant>();

    let (aggregator, log) = common::start_programmable_backend(move |_| {
        let started_tx = started_tx.clone();
        let dropped_tx = dropped_tx.clone();
        async move {
            let _signal = DropSignal(dropped_tx);
            let _ = started_tx.send(());
            tokio::time::sleep(Duration::from_secs(60)).await;
            "never".into_response()
        }
    })
    .await;
    let mut config = common::proxy_config(aggregator, aggregator, false);
    config.timeouts.request_secs = 120;
    config.timeouts.upstream_secs = 60;
    let (proxy, shutdown) = common::start_proxy(config).await;

    // Own client, so aborting the task also drops its connection pool.
    let request = tokio::spawn(async move {
        let client = common::client();
        client.get(format!("http://{proxy}/api/v1/report/org1/cluster1")).send().await
    });

    tokio::time::timeout(Duration::from_secs(5), started_rx.recv())
        .await
        .expect("backend never received the request");
    let aborted_at = Instant::now();
    request.abort();

    let dropped_at = tokio::time::timeout(Duration::from_secs(10), dropped_rx.recv())
        .await
        .expect("backend call still running after the client went away")
        .unwrap();
    assert!(dropped_at.duration_since(aborted_at) < Duration::from_secs(10));
    assert_eq!(log.count(), 1);

    shutdown.trigger();
}

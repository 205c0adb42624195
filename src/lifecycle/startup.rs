//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the metrics recorder
//! - Build the server (and with it the route table)
//! - Bind the listener and serve until a signal arrives
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The server instance is owned here, not stored globally
//! - Listener binds last (traffic only when the route table is ready)

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("server setup: {0}")]
    Server(#[from] ServerError),

    #[error("metrics recorder: {0}")]
    Metrics(#[from] BuildError),

    #[error("HTTP server: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the gateway and serve until SIGINT/SIGTERM.
pub async fn start_service(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.server.bind_address,
        debug = config.server.debug,
        "Starting smart-proxy v{}",
        env!("CARGO_PKG_VERSION")
    );

    let metrics = metrics::install_recorder()?;
    let bind_address = config.server.bind_address.clone();
    let server = HttpServer::new(config, metrics)?;

    let listener = TcpListener::bind(&bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

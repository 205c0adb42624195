//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// HTTP server settings (bind address, API prefix, debug mode).
    pub server: ServerConfig,

    /// Backend service base endpoints.
    pub services: ServicesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Prefix of every public API path. Starts and ends with `/`.
    pub api_prefix: String,

    /// Path to the OpenAPI specification file. Served under the API prefix
    /// by its base name.
    pub api_spec_file: String,

    /// Expose debug-only endpoints and the profiling sub-tree.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            api_prefix: "/api/v1/".to_string(),
            api_spec_file: "openapi.json".to_string(),
            debug: false,
        }
    }
}

/// Base endpoints of the backend services.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServicesConfig {
    /// Aggregator base URL (reports, votes, organizations, clusters).
    pub aggregator: String,

    /// Content service base URL (rule groups).
    pub content: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            aggregator: "http://localhost:8080/api/v1/".to_string(),
            content: "http://localhost:8082/api/v1/".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Inbound request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time to wait for a backend response in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            upstream_secs: 25,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

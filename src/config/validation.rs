//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the API prefix shape and service URLs
//! - Validate value ranges (timeouts > 0, bind address parses)
//! - Keep the backend timeout inside the whole-request timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("`{}` is not a socket address", config.server.bind_address),
        ));
    }

    let prefix = &config.server.api_prefix;
    if !prefix.starts_with('/') || !prefix.ends_with('/') {
        errors.push(ValidationError::new(
            "server.api_prefix",
            format!("`{prefix}` must start and end with `/`"),
        ));
    }
    if prefix.contains(['{', '}']) {
        errors.push(ValidationError::new(
            "server.api_prefix",
            "must not contain placeholders",
        ));
    }

    if config.server.api_spec_file.trim().is_empty() {
        errors.push(ValidationError::new("server.api_spec_file", "must not be empty"));
    }

    for (field, value) in [
        ("services.aggregator", &config.services.aggregator),
        ("services.content", &config.services.content),
    ] {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(_) => errors.push(ValidationError::new(field, format!("`{value}` must be an http or https URL"))),
            Err(e) => errors.push(ValidationError::new(field, format!("`{value}`: {e}"))),
        }
    }

    for (field, value) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    // A backend timeout has to surface as 504 before the whole request times out.
    if config.timeouts.upstream_secs >= config.timeouts.request_secs {
        errors.push(ValidationError::new(
            "timeouts.upstream_secs",
            format!(
                "{} must be less than timeouts.request_secs ({})",
                config.timeouts.upstream_secs, config.timeouts.request_secs
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

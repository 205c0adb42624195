//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;
use toml::Value;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix of environment variables overriding file settings, e.g.
/// `SMART_PROXY__SERVER__DEBUG=true` sets `server.debug`.
pub const ENV_PREFIX: &str = "SMART_PROXY__";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid override {key}: expected a table at `{section}`")]
    Override { key: String, section: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, apply environment overrides and validate the result.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content, std::env::vars())?;

    tracing::debug!(path = %path.display(), "Configuration file loaded");
    Ok(config)
}

/// Parse configuration text with the given environment variables.
pub fn parse_config<I>(content: &str, vars: I) -> Result<ProxyConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut value: Value = toml::from_str(content)?;
    apply_env_overrides(&mut value, vars)?;

    let config: ProxyConfig = value.try_into()?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay `SMART_PROXY__SECTION__KEY` variables onto a parsed document.
///
/// Values are typed as bool, then integer, falling back to string.
pub fn apply_env_overrides<I>(document: &mut Value, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw) in vars {
        let Some(path) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = path
            .split("__")
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect();
        let Some((leaf, sections)) = segments.split_last() else {
            continue;
        };

        let mut table = document.as_table_mut().ok_or_else(|| ConfigError::Override {
            key: key.clone(),
            section: String::new(),
        })?;
        for section in sections {
            table = table
                .entry(section.clone())
                .or_insert_with(|| Value::Table(Default::default()))
                .as_table_mut()
                .ok_or_else(|| ConfigError::Override {
                    key: key.clone(),
                    section: section.clone(),
                })?;
        }

        tracing::debug!(key = %key, "Configuration overridden from environment");
        table.insert(leaf.clone(), typed_value(&raw));
    }
    Ok(())
}

fn typed_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("true") {
        Value::Boolean(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Value::Boolean(false)
    } else if let Ok(n) = raw.parse::<i64>() {
        Value::Integer(n)
    } else {
        Value::String(raw.to_string())
    }
}

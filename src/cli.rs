//! Command dispatch.
//!
//! The first positional argument selects one command. Mapping a token onto a
//! [`Command`] is total: anything unrecognized becomes [`Command::Unknown`] and
//! exits with [`ExitStatus::UnknownCommand`].

use std::path::Path;
use std::process::ExitCode;

use crate::config::{self, LoggingConfig, ProxyConfig};
use crate::lifecycle;
use crate::observability::logging;

pub const HELP_TEMPLATE: &str = "
Smart Proxy service for insights results

Usage:

    {program} [--config <file>] [command]

The commands are:

    <EMPTY>             starts the smart proxy
    start-service       starts the smart proxy
    help                prints help
    print-help          prints help
    print-config        prints current configuration set by files & env variables
    print-env           prints env variables
    print-version       prints version info

";

/// Process exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok = 0,
    /// Configuration could not be loaded or the server failed.
    ServerError = 1,
    UnknownCommand = 2,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartService,
    PrintHelp,
    PrintConfig,
    PrintEnv,
    PrintVersion,
    Unknown(String),
}

impl Command {
    /// Map the first positional argument onto a command. No argument (or a
    /// blank one) starts the service.
    pub fn from_token(token: Option<&str>) -> Self {
        let token = token.map(|t| t.trim().to_lowercase()).unwrap_or_default();
        match token.as_str() {
            "" | "start-service" => Command::StartService,
            "help" | "print-help" => Command::PrintHelp,
            "print-config" => Command::PrintConfig,
            "print-env" => Command::PrintEnv,
            "print-version" | "print-version-info" => Command::PrintVersion,
            _ => Command::Unknown(token),
        }
    }
}

/// Help text with the program name filled in.
pub fn help_message(program: &str) -> String {
    HELP_TEMPLATE.replace("{program}", program)
}

/// Version and build information.
pub fn version_info() -> String {
    format!(
        "smart-proxy {}\nBuild version: {}\nBuild time:    {}\nBuild branch:  {}\nBuild commit:  {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("BUILD_VERSION").unwrap_or("*not set*"),
        option_env!("BUILD_TIME").unwrap_or("*not set*"),
        option_env!("BUILD_BRANCH").unwrap_or("*not set*"),
        option_env!("BUILD_COMMIT").unwrap_or("*not set*"),
    )
}

/// Run one command to completion.
pub async fn handle_command(command: Command, program: &str, config_path: &Path) -> ExitStatus {
    match command {
        Command::StartService => {
            let Some(config) = load_config(config_path) else {
                return ExitStatus::ServerError;
            };
            match lifecycle::start_service(config).await {
                Ok(()) => ExitStatus::Ok,
                Err(e) => {
                    tracing::error!(error = %e, "HTTP(s) start error");
                    ExitStatus::ServerError
                }
            }
        }
        Command::PrintHelp => {
            print!("{}", help_message(program));
            ExitStatus::Ok
        }
        Command::PrintConfig => {
            let Some(config) = load_config(config_path) else {
                return ExitStatus::ServerError;
            };
            match serde_json::to_string_pretty(&config) {
                Ok(json) => {
                    println!("{json}");
                    ExitStatus::Ok
                }
                Err(e) => {
                    tracing::error!(error = %e, "Unable to serialize configuration");
                    ExitStatus::ServerError
                }
            }
        }
        Command::PrintEnv => {
            for (key, value) in std::env::vars_os() {
                println!("{}={}", key.to_string_lossy(), value.to_string_lossy());
            }
            ExitStatus::Ok
        }
        Command::PrintVersion => {
            println!("{}", version_info());
            ExitStatus::Ok
        }
        Command::Unknown(token) => {
            logging::init_logging(&LoggingConfig::default());
            tracing::error!(command = %token, "Unknown command");
            eprint!("{}", help_message(program));
            ExitStatus::UnknownCommand
        }
    }
}

/// Load the configuration and initialize logging from it. Errors are logged
/// with the default logging setup.
fn load_config(path: &Path) -> Option<ProxyConfig> {
    match config::load_config(path) {
        Ok(config) => {
            logging::init_logging(&config.logging);
            tracing::info!(path = %path.display(), "Configuration loaded");
            Some(config)
        }
        Err(e) => {
            logging::init_logging(&LoggingConfig::default());
            tracing::error!(path = %path.display(), error = %e, "Unable to load configuration");
            None
        }
    }
}

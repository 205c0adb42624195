//! Smart Proxy gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   SMART PROXY                    │
//!                      │                                                  │
//!     Client Request   │  ┌─────────┐    ┌────────────┐    ┌───────────┐  │
//!     ─────────────────┼─▶│  http   │───▶│  routing   │───▶│   local   │  │
//!                      │  │ server  │    │ RouteTable │    │ handlers  │  │
//!                      │  └─────────┘    └─────┬──────┘    └───────────┘  │
//!                      │                       │                          │
//!                      │                       ▼                          │
//!     Client Response  │                 ┌────────────┐                   │
//!     ◀────────────────┼─────────────────│   proxy    │◀──────────────────┼──── aggregator /
//!                      │                 │ forwarder  │                   │     content service
//!                      │                 └────────────┘                   │
//!                      │                                                  │
//!                      │  config · observability · lifecycle · cli        │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use smart_proxy::cli::{self, Command, ExitStatus};

#[derive(Parser)]
#[command(name = "smart-proxy")]
#[command(about = "Smart Proxy service for insights results", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Show the help
    #[arg(long)]
    help: bool,

    /// Show the version and exit
    #[arg(long)]
    version: bool,

    /// Configuration file
    #[arg(short, long, env = "SMART_PROXY_CONFIG_FILE", default_value = "config.toml")]
    config: PathBuf,

    /// Command to run (start-service when omitted)
    command: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();
    let program = std::env::args().next().unwrap_or_else(|| "smart-proxy".to_string());

    let command = if args.help {
        Command::PrintHelp
    } else if args.version {
        Command::PrintVersion
    } else {
        Command::from_token(args.command.as_deref())
    };

    let status: ExitStatus = cli::handle_command(command, &program, &args.config).await;
    status.into()
}

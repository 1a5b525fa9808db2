//! bapid - BAPI Bridge Daemon
//!
//! REST gateway that turns HTTP requests into BAPI remote calls with a
//! commit/rollback envelope around every mutation.
//!
//! Usage:
//!   bapid [OPTIONS] [config.toml]
//!
//! Options:
//!   --log-json    Emit logs as JSON lines
//!
//! If no config file is provided, a simulated SAP_DEST with demo data is used.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bapi_api::{create_router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::BridgeConfig;

/// Parsed command-line arguments
struct Args {
    /// Daemon config file (TOML)
    config_path: Option<String>,
    /// JSON log output instead of human-readable lines
    log_json: bool,
}

fn parse_args() -> Args {
    let mut result = Args {
        config_path: None,
        log_json: false,
    };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--log-json" => result.log_json = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                // Positional argument = config file
                result.config_path = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", arg);
            }
        }
    }

    result
}

fn print_help() {
    eprintln!(
        r#"bapid - BAPI Bridge Daemon

Usage: bapid [OPTIONS] [config.toml]

Options:
      --log-json    Emit logs as JSON lines
  -h, --help        Print this help message

Examples:
  # Run against the simulated backend with demo data
  bapid

  # Run with config file
  bapid bapid.toml

  # Verbose core logging
  RUST_LOG=bapi_core=trace bapid bapid.toml
"#
    );
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bapid=info,bapi_api=info,bapi_core=debug,bapi_sim=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = parse_args();
    init_logging(args.log_json);

    tracing::info!("Starting bapid (BAPI Bridge Daemon)");

    let config = if let Some(ref path) = args.config_path {
        tracing::info!("Loading config from: {}", path);
        BridgeConfig::load(path)?
    } else {
        tracing::info!("No config file provided, using simulated backend with demo data");
        BridgeConfig::demo()
    };

    let registry = config.build_registry();
    tracing::info!(
        destinations = ?registry.names(),
        default = %config.backend.destination,
        "Destinations registered"
    );

    // Create the app state and router
    let state = AppState::new(Arc::new(registry), config.backend.destination.clone())
        .with_user_delete_function(config.backend.user_delete_function.clone());
    let app = create_router(state);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.bind))?;
    tracing::info!("Listening on http://{}", addr);

    // Run the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

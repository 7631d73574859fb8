//! ChatHub Server: real-time chat, presence and call signaling.
//!
//! Main entry point that loads configuration, initializes logging and
//! runs the server until Ctrl-C or SIGTERM.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use chathub_core::config::AppConfig;
use chathub_core::config::logging::LoggingConfig;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "chathub-server", version, about = "ChatHub real-time server")]
struct Cli {
    /// Directory holding `default.toml` and the environment overlays.
    #[arg(long, env = "CHATHUB_CONFIG_DIR", default_value = "config")]
    config: String,
    /// Environment overlay to load, e.g. `development` or `production`.
    #[arg(long, env = "CHATHUB_ENV", default_value = "development")]
    env: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.config, &cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config.logging);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_dir = %cli.config,
        env = %cli.env,
        "Starting ChatHub"
    );

    if let Err(e) = chathub_api::run_server(config, shutdown_signal()).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

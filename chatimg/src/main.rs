//! `chatimg` server binary.
//!
//! Loads the layered configuration (see [`chatimg::config`]), installs tracing and serves the
//! upload route until the process is asked to stop. `--validate` checks the configuration and
//! exits without binding a port or touching the database.

use chatimg::{Application, Config, telemetry};
use clap::Parser;
use tokio::signal;

/// Resolve once the process receives Ctrl+C or, on unix, SIGTERM.
///
/// Passed to [`Application::serve`]: uploads already in flight are allowed to finish (the file
/// write and the database insert both complete) before the server returns.
async fn shutdown_signal() {
    let received = wait_for_signal().await;
    tracing::info!(signal = received, "Shutdown requested, draining in-flight uploads");
}

/// Name of the first stop signal delivered to the process
async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // sqlx and the OTLP exporter both build rustls clients
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let args = chatimg::config::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.enable_otel_export)?;
    tracing::debug!(config_file = %args.config, "Configuration loaded");

    Application::new(config).await?.serve(shutdown_signal()).await
}

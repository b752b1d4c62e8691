//! Bona Fide Pusher - listens for REMS event notifications.
//!
//! Approved applications are relayed to Elixir for bona fide status.
//! Stop with Ctrl-C.

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bonafide::{router, serve, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "config_error");
            return Err(e).context("Configuration error");
        }
    };
    info!(
        url = %config.url,
        port = config.port,
        elixir_url = %config.elixir_url,
        elixir_timeout_ms = config.elixir_timeout_ms,
        "config_loaded"
    );

    let client = Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let state = AppState::new(&config, client);
    let app = router(state);

    let listener = TcpListener::bind((config.url.as_str(), config.port))
        .await
        .context("Failed to bind to address")?;

    let address = listener
        .local_addr()
        .context("Failed to read listener address")?;
    info!(address = %address, "event_listener_started");

    // Run server with graceful shutdown
    serve(listener, app, shutdown_signal())
        .await
        .context("Server error")?;

    info!("event_listener_stopped");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
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
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("event_listener_shutting_down");
}

//! Weather Dashboard - Backend Server

use std::net::SocketAddr;

use anyhow::Context;
use weather_dashboard_backend::{config, create_app, init_tracing, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    init_tracing(config.logging.json);

    tracing::info!("Starting Weather Dashboard Server");
    tracing::info!("Environment: {}", config.environment);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host / server.port")?;
    let autostart = config.alerts.autostart;

    // Create application state
    let state = AppState::from_config(config).context("failed to initialize application state")?;

    // Load persisted rules into the poller before it first runs
    state
        .notification_service()
        .sync_poller()
        .await
        .context("failed to load notification rules")?;
    if autostart {
        state.poller.start().await;
    }

    let poller = state.poller.clone();

    // Build application
    let app = create_app(state);

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.stop().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    Router,
    routing::{get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::device_registry::DeviceRegistry;
use crate::infrastructure::config::{DEFAULT_CONFIG_PATH, load_settings};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    connect, disconnect, get_dashboard, get_series, get_snapshot, get_summary, health_check,
    stream_snapshots, toggle_source,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path =
        std::env::var("TELEMETRY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let settings = load_settings(&config_path)?;

    // Initialize tracing, RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    // Shared HTTP client for the live providers (infrastructure layer)
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.thingspeak.timeout_secs))
        .build()?;

    // Per-device stores and controllers (application layer)
    let registry = DeviceRegistry::install(
        settings.devices.clone(),
        settings.thingspeak.clone(),
        client,
    );
    registry.connect_configured();

    let state = Arc::new(AppState {
        registry,
        dashboard_service: DashboardService::new(registry),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/devices/summary", get(get_summary))
        .route("/devices/:kind", get(get_snapshot))
        .route("/devices/:kind/dashboard", get(get_dashboard))
        .route("/devices/:kind/series/:field", get(get_series))
        .route("/devices/:kind/stream", get(stream_snapshots))
        .route("/devices/:kind/connect", post(connect))
        .route("/devices/:kind/disconnect", post(disconnect))
        .route("/devices/:kind/toggle-source", post(toggle_source))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = settings.server.bind_addr.parse()?;
    tracing::info!("Starting device-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.disconnect_all();
    tracing::info!("device-telemetry service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

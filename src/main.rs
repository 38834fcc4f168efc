// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::report_service::ReportService;
use crate::application::timer_stream_service::TimerStreamService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::postgrest_repository::PostgrestRepository;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let app_config = load_app_config()?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(PostgrestRepository::new(
        app_config.backend.url.clone(),
        app_config.backend.api_key.clone(),
        Duration::from_secs(app_config.backend.timeout_secs),
    )?);

    // Create services (application layer)
    let report_service = ReportService::new(repository.clone(), app_config.report_settings()?);
    let timer_stream_service = TimerStreamService::new(repository, app_config.refresh_interval());

    let state = Arc::new(AppState {
        report_service,
        timer_stream_service,
    });

    let router = presentation::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = app_config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid server.bind_addr '{}'", app_config.server.bind_addr))?;
    tracing::info!(%addr, "Starting salon-ops service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

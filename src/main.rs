// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::fetch_orchestrator::FetchOrchestrator;
use crate::infrastructure::config::load_config;
use crate::infrastructure::http_dashboard_repository::HttpDashboardRepository;
use crate::infrastructure::http_sensor_source::HttpSensorDataSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_dashboard, get_widget, health_check, load_dashboard, modify_dashboard, refresh_widget,
    save_dashboard, save_dashboard_as, stream_events, widget_window_action,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_config()?;

    // Create remote adapters (infrastructure layer)
    let sensor_source = Arc::new(HttpSensorDataSource::new(
        &config.sensor_service.base_url,
        &config.sensor_service.data_path,
        Duration::from_secs(config.sensor_service.timeout_secs),
    )?);
    let repository = Arc::new(HttpDashboardRepository::new(config.persistence.clone()));

    // Create services (application layer)
    let dashboard_service = DashboardService::new(
        config.dashboard.machinery_id.clone(),
        FetchOrchestrator::new(sensor_source),
        repository,
        config.dashboard.grid_size(),
        config.dashboard.widget_defaults(),
    );

    if let Err(e) = dashboard_service.load(None).await {
        tracing::warn!(
            "No default dashboard for {}, starting empty: {}",
            config.dashboard.machinery_id,
            e
        );
    }
    let _live_tail =
        dashboard_service.spawn_live_tail(Duration::from_secs(config.dashboard.poll_interval_secs.max(1)));

    // Create application state
    let state = Arc::new(AppState { dashboard_service });

    // Build router (presentation layer)
    // Responses are compressed by the handlers, so no CompressionLayer here
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/load", post(load_dashboard))
        .route("/dashboard/save", post(save_dashboard))
        .route("/dashboard/save-as", post(save_dashboard_as))
        .route("/dashboard/modifications", post(modify_dashboard))
        .route("/widgets/:id", get(get_widget))
        .route("/widgets/:id/window", post(widget_window_action))
        .route("/widgets/:id/refresh", post(refresh_widget))
        .route("/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting machinery-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

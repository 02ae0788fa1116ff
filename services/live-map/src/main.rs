//! Live Map - flight map dashboard
//!
//! Polls the dashboard backend for flight positions, reconciles them into map
//! markers and flight paths, and streams the resulting scene to browser
//! clients over WebSocket.

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dashboard;
mod error;
mod feed;
mod map;
mod panel;
mod paths;
mod reconciler;
mod rings;
mod throttle;
mod vessel;
mod ws_handler;

use crate::config::Config;
use dashboard::{Dashboard, DashboardOptions, PollTask};
use feed::{FeedClient, LatLon};
use map::SceneSurface;

/// Shared application state
pub struct AppState {
    pub dashboard: Arc<Dashboard<SceneSurface>>,
    /// Initial map view center sent to new clients
    pub center: LatLon,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("live_map=info".parse()?)
            .add_directive("tower_http=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("===========================================");
    info!("   Live Map - Flight Dashboard");
    info!("===========================================");

    let config = Config::load()?;

    info!("Configuration:");
    info!("  Backend: {}", config.api_base_url);
    info!("  Poll interval: {} ms", config.poll_interval_ms);
    info!("  Map center: ({:.4}, {:.4})", config.center_lat, config.center_lon);
    info!("  Path tracking: {}", config.track_paths);
    info!("  Viewport filter: {}", config.viewport_filter);
    info!("  HTTP/WS port: {}", config.listen_port);

    // Broadcast channel for WebSocket clients
    let (broadcast_tx, _) = broadcast::channel::<String>(1000);

    let client = FeedClient::new(&config.api_base_url, config.request_timeout())?;
    info!("Polling {}", client.flights_url());
    let surface = SceneSurface::new(broadcast_tx);
    let dashboard = Arc::new(Dashboard::new(client, surface, DashboardOptions::from(&config)));

    // First tick runs right away, then every poll interval
    let poller = PollTask::spawn(dashboard.clone(), config.poll_interval());

    let app_state = Arc::new(AppState {
        dashboard: dashboard.clone(),
        center: config.center(),
    });

    let app = router(app_state);

    let http_addr = format!("0.0.0.0:{}", config.listen_port);
    info!("Starting HTTP/WebSocket server on {}", http_addr);

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    let http_server = axum::serve(listener, app);

    tokio::select! {
        result = http_server => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    // Teardown: stop polling, then release everything on the map
    poller.shutdown().await;
    info!("Final state: {}", dashboard.summary().await);
    dashboard.teardown().await;

    info!("Shutdown complete");
    Ok(())
}

/// HTTP and WebSocket routes
fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler::ws_handler))
        .route("/api/scene", get(get_scene))
        .route("/health", get(health_check))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Current retained scene
async fn get_scene(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let scene = state.dashboard.with_surface(|s| s.scene().clone()).await;
    Json(scene)
}

//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes for drive, spray, stream session and telemetry
//! - Request validation
//! - Dashboard WebSocket upgrade

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let realtime_ok = state.publisher.health_check().await.unwrap_or(false);

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        realtime_db_connected: realtime_ok,
        stream_session_active: state.monitor.is_running().await,
        dashboard_clients: state.realtime.connection_count(),
    };

    Json(response)
}

/// Device identity endpoint
pub async fn device_status(State(_state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "device_type": "roverlink-bridge",
        "firmware_version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

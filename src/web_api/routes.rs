//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::command_publisher::ControlState;
use crate::direction_classifier::{classify, Command, PointerOffset};
use crate::error::Result;
use crate::models::ApiResponse;
use crate::realtime_hub::{ControlEchoMessage, HubMessage};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api/status", get(super::device_status))
        // Drive control
        .route("/api/drive", post(drive))
        .route("/api/drive/stop", post(drive_stop))
        .route("/api/spray", post(spray))
        // Stream session
        .route("/api/stream", get(get_stream))
        .route("/api/stream/watch", post(watch_stream))
        .route("/api/stream/watch", delete(unwatch_stream))
        .route("/api/stream/visible", post(stream_visible))
        .route("/api/stream/retry", post(stream_retry))
        .route("/api/stream/render-failed", post(stream_render_failed))
        // Telemetry & Map
        .route("/api/telemetry", get(get_telemetry))
        .route("/api/map", get(get_map))
        // WebSocket
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

// ========================================
// Drive Control
// ========================================

/// Raw joystick displacement from the dashboard
#[derive(Debug, Deserialize)]
struct DriveRequest {
    x: f64,
    y: f64,
}

/// Spray toggle; omitted sides keep their current value
#[derive(Debug, Deserialize)]
struct SprayRequest {
    left: Option<bool>,
    right: Option<bool>,
}

/// Classify a joystick displacement and publish the resulting command
async fn drive(
    State(state): State<AppState>,
    Json(req): Json<DriveRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let command = classify(PointerOffset { x: req.x, y: req.y }, state.config.stick)?;
    let control = apply_command(&state, command).await;

    publish_and_echo(&state, control).await;

    Ok(Json(ApiResponse::success(json!({
        "command": command.as_str(),
    }))))
}

/// Force the stick back to center (pointer released)
async fn drive_stop(State(state): State<AppState>) -> Result<Json<ApiResponse<Value>>> {
    let control = apply_command(&state, Command::Center).await;

    publish_and_echo(&state, control).await;

    Ok(Json(ApiResponse::success(json!({
        "command": Command::Center.as_str(),
    }))))
}

/// Update the spray pair and publish
async fn spray(
    State(state): State<AppState>,
    Json(req): Json<SprayRequest>,
) -> Result<Json<ApiResponse<Value>>> {
    let control = {
        let mut control = state.control.write().await;
        if let Some(left) = req.left {
            control.spray_left = left;
        }
        if let Some(right) = req.right {
            control.spray_right = right;
        }
        *control
    };

    publish_and_echo(&state, control).await;

    Ok(Json(ApiResponse::success(json!({
        "spray_left": control.spray_left,
        "spray_right": control.spray_right,
    }))))
}

async fn apply_command(state: &AppState, command: Command) -> ControlState {
    let mut control = state.control.write().await;
    control.command = command;
    *control
}

/// Publish the control document and mirror it to connected dashboards.
///
/// The write is fire-and-forget; a publish failure is logged and the
/// request still succeeds with the applied control state.
async fn publish_and_echo(state: &AppState, control: ControlState) {
    state.publisher.publish_logged(&control).await;

    state
        .realtime
        .broadcast(HubMessage::ControlEcho(ControlEchoMessage {
            command: control.command,
            spray_left: control.spray_left,
            spray_right: control.spray_right,
            timestamp: Utc::now().to_rfc3339(),
        }))
        .await;
}

// ========================================
// Stream Session
// ========================================

/// Current stream display state
async fn get_stream(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.monitor.state().await))
}

/// Start a viewing session (probe loop comes up)
async fn watch_stream(State(state): State<AppState>) -> impl IntoResponse {
    state.monitor.start().await;
    Json(ApiResponse::success(json!({ "watching": true })))
}

/// End the viewing session (probe loop torn down, state reset)
async fn unwatch_stream(State(state): State<AppState>) -> impl IntoResponse {
    state.monitor.stop().await;
    Json(ApiResponse::success(json!({ "watching": false })))
}

/// The dashboard became visible again; probe now
async fn stream_visible(State(state): State<AppState>) -> impl IntoResponse {
    state.monitor.refresh().await;
    Json(ApiResponse::success(state.monitor.state().await))
}

/// User-initiated retry
async fn stream_retry(State(state): State<AppState>) -> impl IntoResponse {
    state.monitor.retry().await;
    Json(ApiResponse::success(state.monitor.state().await))
}

/// The video surface failed to render the URL it was given
async fn stream_render_failed(State(state): State<AppState>) -> impl IntoResponse {
    state.monitor.report_render_failure().await;
    Json(ApiResponse::success(state.monitor.state().await))
}

// ========================================
// Telemetry & Map
// ========================================

/// Latest telemetry snapshot with display formatting
async fn get_telemetry(State(state): State<AppState>) -> impl IntoResponse {
    match state.telemetry.latest().await {
        Some(snapshot) => {
            let readings = snapshot.readings();
            Json(ApiResponse::success(json!({
                "snapshot": snapshot,
                "readings": readings,
            })))
        }
        None => Json(ApiResponse::error("No telemetry received yet")),
    }
}

/// Map marker position, present only when both coordinates are finite
async fn get_map(State(state): State<AppState>) -> impl IntoResponse {
    let position = state
        .telemetry
        .latest()
        .await
        .and_then(|snapshot| snapshot.map_position());

    match position {
        Some((lat, lng)) => Json(ApiResponse::success(json!({
            "available": true,
            "lat": lat,
            "lng": lng,
        }))),
        None => Json(ApiResponse::success(json!({ "available": false }))),
    }
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Register with RealtimeHub
    let (conn_id, mut rx) = state.realtime.register().await;

    // Forward hub messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Drain incoming messages until the client goes away
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
        conn_id
    });

    let conn_id = tokio::select! {
        _ = send_task => conn_id,
        result = recv_task => result.unwrap_or(conn_id),
    };

    state.realtime.unregister(&conn_id).await;
}

//! RealtimeHub - WebSocket Distribution
//!
//! ## Responsibilities
//!
//! - Dashboard WebSocket connection management
//! - Telemetry snapshot broadcasting
//! - Stream status and control echo notifications
//!
//! Note: only notifications travel over the socket; the dashboard issues
//! drive/spray/stream commands over the REST API.

use crate::direction_classifier::Command;
use crate::stream_monitor::StreamState;
use crate::telemetry_service::TelemetrySnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Hub message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HubMessage {
    /// Fresh telemetry snapshot from the vehicle
    TelemetryUpdate(TelemetrySnapshot),
    /// Stream health changed (probe result or renderer failure)
    StreamStatus(StreamStatusMessage),
    /// A control write was accepted; dashboards mirror the active command
    ControlEcho(ControlEchoMessage),
}

/// Stream status message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStatusMessage {
    #[serde(flatten)]
    pub state: StreamState,
    pub timestamp: String,
}

/// Control echo message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlEchoMessage {
    pub command: Command,
    pub spray_left: bool,
    pub spray_right: bool,
    pub timestamp: String,
}

/// Client connection
struct ClientConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new dashboard client
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { id, tx });
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, "Dashboard client connected");

        (id, rx)
    }

    /// Unregister a client
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Dashboard client disconnected");
        }
    }

    /// Broadcast message to all clients
    pub async fn broadcast(&self, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize hub message");
                return;
            }
        };

        let connections = self.connections.read().await;
        for conn in connections.values() {
            if let Err(e) = conn.tx.send(json.clone()) {
                tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
            }
        }
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_delivers_broadcasts() {
        let hub = RealtimeHub::new();
        let (_id, mut rx) = hub.register().await;

        hub.broadcast(HubMessage::ControlEcho(ControlEchoMessage {
            command: Command::Up,
            spray_left: false,
            spray_right: true,
            timestamp: "2026-08-07T00:00:00Z".to_string(),
        }))
        .await;

        let raw = rx.recv().await.expect("broadcast delivered");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["type"], "control_echo");
        assert_eq!(value["data"]["command"], "up");
        assert_eq!(value["data"]["spray_right"], true);
    }

    #[tokio::test]
    async fn unregister_drops_connection() {
        let hub = RealtimeHub::new();
        let (id, _rx) = hub.register().await;
        assert_eq!(hub.connection_count(), 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count(), 0);
    }
}

//! Application state
//!
//! Holds the shared services and configuration

use crate::command_publisher::{CommandPublisher, ControlState};
use crate::direction_classifier::StickGeometry;
use crate::realtime_hub::RealtimeHub;
use crate::stream_monitor::StreamMonitor;
use crate::telemetry_service::TelemetryService;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Realtime database REST base URL (controls + telemetry documents)
    pub realtime_base_url: String,
    /// Camera stream endpoint probed for liveness
    pub stream_url: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Dashboard static asset directory
    pub static_dir: String,
    /// Stream probe timeout in milliseconds
    pub probe_timeout_ms: u64,
    /// Stream probe interval in milliseconds
    pub probe_interval_ms: u64,
    /// Telemetry poll interval in milliseconds
    pub telemetry_poll_ms: u64,
    /// Joystick geometry for drive classification
    pub stick: StickGeometry,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            realtime_base_url: std::env::var("REALTIME_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9000/rover".to_string()),
            stream_url: std::env::var("STREAM_URL")
                .unwrap_or_else(|_| "http://192.168.4.1:8081/stream".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            static_dir: std::env::var("STATIC_DIR")
                .unwrap_or_else(|_| "/opt/roverlink/dashboard/dist".to_string()),
            probe_timeout_ms: env_u64("PROBE_TIMEOUT_MS", 3000),
            probe_interval_ms: env_u64("PROBE_INTERVAL_MS", 5000),
            telemetry_poll_ms: env_u64("TELEMETRY_POLL_MS", 1000),
            stick: StickGeometry {
                radius: env_f64("STICK_RADIUS", 70.0),
                dead_zone: env_f64("STICK_DEAD_ZONE", 20.0),
                axis_priority: env_f64("STICK_AXIS_PRIORITY", 0.5),
            },
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Current control intent (command + spray pair)
    pub control: Arc<RwLock<ControlState>>,
    /// CommandPublisher (realtime DB writes)
    pub publisher: Arc<CommandPublisher>,
    /// StreamMonitor (camera liveness)
    pub monitor: Arc<StreamMonitor>,
    /// TelemetryService (vehicle sensor feed)
    pub telemetry: Arc<TelemetryService>,
    /// RealtimeHub (dashboard WebSocket fan-out)
    pub realtime: Arc<RealtimeHub>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

//! Telemetry Service - Vehicle Sensor Feed
//!
//! ## Responsibilities
//!
//! - Poll the realtime database telemetry document
//! - Normalize loosely-typed fields (the controller writes numbers or strings)
//! - Gate the map position on finite coordinates
//! - Broadcast snapshots over the realtime hub
//!
//! Every field is optional. A missing field stays missing and renders as the
//! "n/a" sentinel, never as zero.

use crate::realtime_hub::{HubMessage, RealtimeHub};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;

/// Sentinel shown for readings the vehicle has not reported
pub const NOT_AVAILABLE: &str = "n/a";

/// Normalized telemetry snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub accel_x: Option<f64>,
    pub accel_y: Option<f64>,
    pub accel_z: Option<f64>,
    pub distance_cm: Option<f64>,
    pub motion: Option<bool>,
    pub pwm: Option<f64>,
    pub spray_left: Option<bool>,
    pub spray_right: Option<bool>,
    /// Dashboard-side geolocation fix
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Vehicle GPS fix
    pub geolat: Option<f64>,
    pub geolong: Option<f64>,
    pub received_at: String,
}

impl TelemetrySnapshot {
    /// Build a snapshot from the raw realtime database document
    pub fn from_document(doc: &Value) -> Self {
        Self {
            accel_x: parse_finite(&doc["accel_x"]),
            accel_y: parse_finite(&doc["accel_y"]),
            accel_z: parse_finite(&doc["accel_z"]),
            distance_cm: parse_finite(&doc["distance_cm"]),
            motion: parse_flag(&doc["motion"]),
            pwm: parse_finite(&doc["pwm"]),
            spray_left: parse_flag(&doc["spray_left"]),
            spray_right: parse_flag(&doc["spray_right"]),
            latitude: parse_finite(&doc["latitude"]),
            longitude: parse_finite(&doc["longitude"]),
            geolat: parse_finite(&doc["geolat"]),
            geolong: parse_finite(&doc["geolong"]),
            received_at: Utc::now().to_rfc3339(),
        }
    }

    /// Map marker position, vehicle GPS preferred over the dashboard fix.
    ///
    /// Returns nothing unless both coordinates of a pair are finite, so the
    /// map never recenters on a half-parsed update.
    pub fn map_position(&self) -> Option<(f64, f64)> {
        match (self.geolat, self.geolong) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => match (self.latitude, self.longitude) {
                (Some(lat), Some(lng)) => Some((lat, lng)),
                _ => None,
            },
        }
    }

    /// Display strings for the dashboard's sensor panel
    pub fn readings(&self) -> Value {
        serde_json::json!({
            "accel_x": display_reading(self.accel_x, ""),
            "accel_y": display_reading(self.accel_y, ""),
            "accel_z": display_reading(self.accel_z, ""),
            "distance": display_reading(self.distance_cm, " cm"),
            "pwm": display_reading(self.pwm, ""),
            "motion": display_flag(self.motion),
            "spray_left": display_flag(self.spray_left),
            "spray_right": display_flag(self.spray_right),
        })
    }
}

/// Format a numeric reading, or the sentinel when missing
fn display_reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v}{unit}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Format a flag reading, or the sentinel when missing
fn display_flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "on".to_string(),
        Some(false) => "off".to_string(),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Parse a number-or-string field into a finite f64
fn parse_finite(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse a "1"/"0" flag field. "1" (or numeric 1) is set, any other present
/// value is clear, absent stays unknown.
fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::String(s) => Some(s == "1"),
        Value::Number(n) => Some(n.as_f64() == Some(1.0)),
        Value::Bool(b) => Some(*b),
        _ => None,
    }
}

/// TelemetryService instance
pub struct TelemetryService {
    http: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    latest: Arc<RwLock<Option<TelemetrySnapshot>>>,
    running: Arc<RwLock<bool>>,
    hub: Arc<RealtimeHub>,
}

impl TelemetryService {
    /// Create new TelemetryService against the realtime database base URL
    pub fn new(base_url: String, poll_interval: Duration, hub: Arc<RealtimeHub>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url,
            poll_interval,
            latest: Arc::new(RwLock::new(None)),
            running: Arc::new(RwLock::new(false)),
            hub,
        }
    }

    fn telemetry_url(&self) -> String {
        format!("{}/telemetry.json", self.base_url.trim_end_matches('/'))
    }

    /// Start the poll loop
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Telemetry polling already running");
                return;
            }
            *running = true;
        }

        tracing::info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "Starting telemetry polling"
        );

        let http = self.http.clone();
        let url = self.telemetry_url();
        let latest = self.latest.clone();
        let running = self.running.clone();
        let hub = self.hub.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut interval = interval(poll_interval);

            loop {
                interval.tick().await;

                {
                    let is_running = running.read().await;
                    if !*is_running {
                        break;
                    }
                }

                match Self::fetch(&http, &url).await {
                    Ok(snapshot) => {
                        {
                            let mut latest = latest.write().await;
                            *latest = Some(snapshot.clone());
                        }
                        hub.broadcast(HubMessage::TelemetryUpdate(snapshot)).await;
                    }
                    Err(e) => {
                        // Keep the last snapshot; the vehicle may just be offline
                        tracing::warn!(error = %e, "Telemetry poll failed");
                    }
                }
            }

            tracing::info!("Telemetry polling stopped");
        });
    }

    /// Stop the poll loop
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping telemetry polling");
    }

    /// Latest snapshot, if the vehicle has reported at all
    pub async fn latest(&self) -> Option<TelemetrySnapshot> {
        self.latest.read().await.clone()
    }

    async fn fetch(http: &reqwest::Client, url: &str) -> crate::error::Result<TelemetrySnapshot> {
        let doc: Value = http.get(url).send().await?.json().await?;
        Ok(TelemetrySnapshot::from_document(&doc))
    }
}

//! Stream Monitor - Camera Feed Liveness Tracking
//!
//! ## Responsibilities
//!
//! - Periodic reachability probes against the camera stream endpoint
//! - Fallback to the last known-good URL while the feed is down
//! - Visibility-triggered and manual refresh on top of the fixed interval
//! - Renderer failure intake (the dashboard's video surface reporting back)
//!
//! The monitor is scoped to a viewing session: `start` brings up the probe
//! loop, `stop` tears it down and resets the state. Overlapping probes
//! resolve last-write-wins; each merge runs under the state write lock.

mod prober;

pub use prober::StreamProber;

use crate::realtime_hub::{HubMessage, RealtimeHub, StreamStatusMessage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;

/// Outcome of a single reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// Endpoint responded; carries the cache-busted URL that answered
    Success(String),
    /// Timeout or transport error
    Failure,
}

/// Stream display state.
///
/// Invariant: when `has_error` is set, `current_url` equals `last_good_url`
/// if one exists and is empty otherwise, so a URL known to be broken is
/// never surfaced while a better one is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    pub current_url: Option<String>,
    pub last_good_url: Option<String>,
    pub has_error: bool,
}

impl StreamState {
    /// Fold one probe result into the state. Pure and idempotent.
    pub fn apply(&self, result: &ProbeResult) -> StreamState {
        match result {
            ProbeResult::Success(url) => StreamState {
                current_url: Some(url.clone()),
                last_good_url: Some(url.clone()),
                has_error: false,
            },
            ProbeResult::Failure => match &self.last_good_url {
                Some(url) => StreamState {
                    current_url: Some(url.clone()),
                    last_good_url: Some(url.clone()),
                    has_error: true,
                },
                None => StreamState {
                    current_url: None,
                    last_good_url: None,
                    has_error: true,
                },
            },
        }
    }
}

/// StreamMonitor instance
pub struct StreamMonitor {
    prober: StreamProber,
    probe_interval: Duration,
    state: Arc<RwLock<StreamState>>,
    running: Arc<RwLock<bool>>,
    hub: Arc<RealtimeHub>,
}

impl StreamMonitor {
    /// Create new StreamMonitor
    pub fn new(prober: StreamProber, probe_interval: Duration, hub: Arc<RealtimeHub>) -> Self {
        Self {
            prober,
            probe_interval,
            state: Arc::new(RwLock::new(StreamState::default())),
            running: Arc::new(RwLock::new(false)),
            hub,
        }
    }

    /// Start the viewing session probe loop.
    ///
    /// Probes immediately, then on the fixed interval until `stop`.
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Stream monitor already running");
                return;
            }
            *running = true;
        }

        tracing::info!(interval_ms = self.probe_interval.as_millis() as u64, "Starting stream monitor");

        let prober = self.prober.clone();
        let state = self.state.clone();
        let running = self.running.clone();
        let hub = self.hub.clone();
        let probe_interval = self.probe_interval;

        tokio::spawn(async move {
            // First tick fires immediately
            let mut interval = interval(probe_interval);

            loop {
                interval.tick().await;

                {
                    let is_running = running.read().await;
                    if !*is_running {
                        break;
                    }
                }

                Self::probe_and_apply(&prober, &state, &hub).await;
            }

            tracing::info!("Stream monitor stopped");
        });
    }

    /// End the viewing session: stop the probe loop and reset the state
    pub async fn stop(&self) {
        {
            let mut running = self.running.write().await;
            *running = false;
        }
        {
            let mut state = self.state.write().await;
            *state = StreamState::default();
        }
        tracing::info!("Stopping stream monitor, session state reset");
    }

    /// Whether a viewing session is active
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Current stream state snapshot
    pub async fn state(&self) -> StreamState {
        self.state.read().await.clone()
    }

    /// Supplementary probe when the dashboard becomes visible again.
    ///
    /// Runs alongside the interval timer, not instead of it.
    pub async fn refresh(&self) {
        if !self.is_running().await {
            tracing::debug!("Visibility refresh ignored, no active session");
            return;
        }
        Self::probe_and_apply(&self.prober, &self.state, &self.hub).await;
    }

    /// User-initiated retry.
    ///
    /// Clears the error flag optimistically before the probe resolves so a
    /// stale offline banner disappears without waiting for the round trip.
    pub async fn retry(&self) {
        if !self.is_running().await {
            tracing::debug!("Manual retry ignored, no active session");
            return;
        }

        let cleared = {
            let mut state = self.state.write().await;
            state.has_error = false;
            state.clone()
        };
        Self::broadcast_status(&self.hub, &cleared).await;

        Self::probe_and_apply(&self.prober, &self.state, &self.hub).await;
    }

    /// The dashboard's video surface failed to render the URL it was given.
    ///
    /// Treated as one more failure through the same reducer, independent of
    /// the timer-driven probes.
    pub async fn report_render_failure(&self) {
        tracing::warn!("Renderer reported stream failure");
        Self::apply_result(&self.state, &self.hub, ProbeResult::Failure).await;
    }

    /// Probe once and fold the outcome into the state
    async fn probe_and_apply(
        prober: &StreamProber,
        state: &RwLock<StreamState>,
        hub: &RealtimeHub,
    ) {
        let result = prober.probe().await;
        Self::apply_result(state, hub, result).await;
    }

    /// Fold a result into the shared state and notify clients
    async fn apply_result(state: &RwLock<StreamState>, hub: &RealtimeHub, result: ProbeResult) {
        let next = {
            let mut state = state.write().await;
            let next = state.apply(&result);

            if !state.has_error && next.has_error {
                match &next.last_good_url {
                    Some(url) => tracing::warn!(
                        fallback_url = %url,
                        "Stream unreachable, falling back to last good URL"
                    ),
                    None => tracing::warn!("Stream unreachable and never connected"),
                }
            } else if state.has_error && !next.has_error {
                tracing::info!("Stream recovered");
            }

            *state = next.clone();
            next
        };

        Self::broadcast_status(hub, &next).await;
    }

    async fn broadcast_status(hub: &RealtimeHub, state: &StreamState) {
        hub.broadcast(HubMessage::StreamStatus(StreamStatusMessage {
            state: state.clone(),
            timestamp: Utc::now().to_rfc3339(),
        }))
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(url: &str) -> ProbeResult {
        ProbeResult::Success(url.to_string())
    }

    fn good_state(url: &str) -> StreamState {
        StreamState {
            current_url: Some(url.to_string()),
            last_good_url: Some(url.to_string()),
            has_error: false,
        }
    }

    #[test]
    fn success_replaces_url_and_clears_error() {
        let state = StreamState {
            current_url: Some("A".to_string()),
            last_good_url: Some("A".to_string()),
            has_error: true,
        };
        let next = state.apply(&success("B"));
        assert_eq!(next.current_url.as_deref(), Some("B"));
        assert_eq!(next.last_good_url.as_deref(), Some("B"));
        assert!(!next.has_error);
    }

    #[test]
    fn failure_falls_back_to_last_good_url() {
        let next = good_state("A").apply(&ProbeResult::Failure);
        assert_eq!(next.current_url.as_deref(), Some("A"));
        assert_eq!(next.last_good_url.as_deref(), Some("A"));
        assert!(next.has_error);
    }

    #[test]
    fn failure_without_history_surfaces_nothing() {
        let next = StreamState::default().apply(&ProbeResult::Failure);
        assert_eq!(next.current_url, None);
        assert_eq!(next.last_good_url, None);
        assert!(next.has_error);
    }

    #[test]
    fn apply_is_idempotent() {
        let results = [success("B"), ProbeResult::Failure];
        let starts = [StreamState::default(), good_state("A")];
        for result in &results {
            for start in &starts {
                let once = start.apply(result);
                let twice = once.apply(result);
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn error_state_never_hides_a_usable_url() {
        // Outage then recovery then outage again
        let state = StreamState::default()
            .apply(&ProbeResult::Failure)
            .apply(&success("A"))
            .apply(&ProbeResult::Failure);
        assert!(state.has_error);
        assert_eq!(state.current_url, state.last_good_url);
        assert_eq!(state.current_url.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn render_failure_feeds_the_reducer() {
        let hub = Arc::new(RealtimeHub::new());
        let monitor = StreamMonitor::new(
            StreamProber::new("http://127.0.0.1:9/stream".to_string(), Duration::from_millis(200)),
            Duration::from_secs(5),
            hub,
        );

        monitor.report_render_failure().await;

        let state = monitor.state().await;
        assert!(state.has_error);
        assert_eq!(state.last_good_url, None);
    }

    #[tokio::test]
    async fn start_probes_immediately_and_stop_resets() {
        let hub = Arc::new(RealtimeHub::new());
        let monitor = StreamMonitor::new(
            StreamProber::new("http://127.0.0.1:9/stream".to_string(), Duration::from_millis(200)),
            Duration::from_secs(60),
            hub,
        );

        monitor.start().await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        // Nothing listens on the probe target, so the first probe failed
        let state = monitor.state().await;
        assert!(state.has_error);

        monitor.stop().await;
        assert!(!monitor.is_running().await);
        assert_eq!(monitor.state().await, StreamState::default());
    }

    #[tokio::test]
    async fn retry_outside_a_session_is_ignored() {
        let hub = Arc::new(RealtimeHub::new());
        let monitor = StreamMonitor::new(
            StreamProber::new("http://127.0.0.1:9/stream".to_string(), Duration::from_millis(200)),
            Duration::from_secs(5),
            hub,
        );

        monitor.retry().await;
        assert_eq!(monitor.state().await, StreamState::default());
    }
}

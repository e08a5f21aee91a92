//! Stream reachability probe

use super::ProbeResult;
use chrono::Utc;
use std::time::Duration;

/// Probes the camera stream endpoint with a lightweight existence check.
///
/// Every probe carries a fresh cache-busting token so intermediate caches
/// never answer for the camera.
#[derive(Clone)]
pub struct StreamProber {
    client: reqwest::Client,
    base_url: String,
}

impl StreamProber {
    /// Create a prober bound to `timeout` per request
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    /// Probe the stream endpoint once.
    ///
    /// A HEAD request, not a content fetch. Any resolved response counts as
    /// reachable; timeouts and transport errors resolve to `Failure` and are
    /// never propagated.
    pub async fn probe(&self) -> ProbeResult {
        let url = cache_busted(&self.base_url, Utc::now().timestamp_millis());

        match self.client.head(&url).send().await {
            Ok(resp) => {
                tracing::debug!(url = %url, status = %resp.status(), "Stream probe resolved");
                ProbeResult::Success(url)
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Stream probe failed");
                ProbeResult::Failure
            }
        }
    }
}

/// Append a cache-busting token to the stream URL
pub(crate) fn cache_busted(base: &str, token: i64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}t={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_query_string() {
        assert_eq!(
            cache_busted("http://cam.local/stream", 1000),
            "http://cam.local/stream?t=1000"
        );
    }

    #[test]
    fn token_extends_existing_query() {
        assert_eq!(
            cache_busted("http://cam.local/stream?src=front", 1000),
            "http://cam.local/stream?src=front&t=1000"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_resolves_to_failure() {
        // Port 9 (discard) is not listening locally
        let prober = StreamProber::new(
            "http://127.0.0.1:9/stream".to_string(),
            Duration::from_millis(500),
        );
        assert!(matches!(prober.probe().await, ProbeResult::Failure));
    }
}

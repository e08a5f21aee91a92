//! Command Publisher - Realtime Database Control Writes
//!
//! ## Responsibilities
//!
//! - Hold the current control intent (drive command + spray pair)
//! - Serialize it as the flat "1"/"0" document the embedded controller polls
//! - PATCH the document to the realtime database REST endpoint
//!
//! The string-flag encoding is a wire contract and stays at this boundary;
//! everything inside the bridge works with `Command` and `bool`.
//!
//! Publishes are fire-and-forget: each state change issues one independent
//! write, failures are logged and never retried.

use crate::direction_classifier::Command;
use crate::error::{Error, Result};
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

/// Wire form of a boolean flag
fn flag(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

/// Current control intent for the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub command: Command,
    pub spray_left: bool,
    pub spray_right: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            command: Command::Center,
            spray_left: false,
            spray_right: false,
        }
    }
}

impl ControlState {
    /// Flat document written to the realtime database.
    ///
    /// The controller reads each direction key independently, so all four
    /// are always present and exactly one is "1" (none for center).
    pub fn to_document(&self, updated_at_ms: i64) -> Value {
        json!({
            "up": flag(self.command == Command::Up),
            "down": flag(self.command == Command::Down),
            "left": flag(self.command == Command::Left),
            "right": flag(self.command == Command::Right),
            "spray_left": flag(self.spray_left),
            "spray_right": flag(self.spray_right),
            "updated_at": updated_at_ms,
        })
    }
}

/// CommandPublisher instance
pub struct CommandPublisher {
    http: reqwest::Client,
    base_url: String,
}

impl CommandPublisher {
    /// Create new CommandPublisher against the realtime database base URL
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { http, base_url }
    }

    fn controls_url(&self) -> String {
        format!("{}/controls.json", self.base_url.trim_end_matches('/'))
    }

    /// Write the control document
    pub async fn publish(&self, control: &ControlState) -> Result<()> {
        let doc = control.to_document(Utc::now().timestamp_millis());
        let url = self.controls_url();

        let resp = self.http.patch(&url).json(&doc).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Realtime(format!(
                "control write rejected: {}",
                resp.status()
            )));
        }

        tracing::debug!(command = %control.command.as_str(), "Control document published");
        Ok(())
    }

    /// Write the control document, absorbing any failure.
    ///
    /// The dashboard is never blocked on the cloud write; a lost update is
    /// superseded by the next state change anyway.
    pub async fn publish_logged(&self, control: &ControlState) {
        if let Err(e) = self.publish(control).await {
            tracing::error!(
                command = %control.command.as_str(),
                error = %e,
                "Control publish failed"
            );
        }
    }

    /// Check that the realtime database answers at all
    pub async fn health_check(&self) -> Result<bool> {
        let url = self.controls_url();
        let resp = self.http.head(&url).send().await?;
        Ok(resp.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_direction_flag_is_set() {
        for (command, key) in [
            (Command::Up, "up"),
            (Command::Down, "down"),
            (Command::Left, "left"),
            (Command::Right, "right"),
        ] {
            let doc = ControlState {
                command,
                spray_left: false,
                spray_right: false,
            }
            .to_document(0);

            for candidate in ["up", "down", "left", "right"] {
                let expected = if candidate == key { "1" } else { "0" };
                assert_eq!(doc[candidate], expected, "{candidate} for {key}");
            }
        }
    }

    #[test]
    fn center_clears_all_direction_flags() {
        let doc = ControlState::default().to_document(0);
        for key in ["up", "down", "left", "right", "spray_left", "spray_right"] {
            assert_eq!(doc[key], "0");
        }
    }

    #[test]
    fn spray_flags_are_independent_of_the_command() {
        let doc = ControlState {
            command: Command::Up,
            spray_left: true,
            spray_right: false,
        }
        .to_document(0);
        assert_eq!(doc["up"], "1");
        assert_eq!(doc["spray_left"], "1");
        assert_eq!(doc["spray_right"], "0");
    }

    #[test]
    fn flags_are_strings_not_booleans() {
        let doc = ControlState {
            command: Command::Right,
            spray_left: true,
            spray_right: true,
        }
        .to_document(42);
        assert!(doc["right"].is_string());
        assert!(doc["spray_left"].is_string());
        assert_eq!(doc["updated_at"], 42);
    }
}

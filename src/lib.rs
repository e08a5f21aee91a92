//! RoverLink Bridge
//!
//! Control and telemetry bridge for a camera-equipped RC rover. The
//! dashboard in the browser talks to this service; the service talks to
//! the cloud realtime database the rover's embedded controller polls.
//!
//! ## Architecture (6 Components)
//!
//! 1. DirectionClassifier - Joystick displacement to drive command
//! 2. CommandPublisher - Control document writes to the realtime DB
//! 3. StreamMonitor - Camera feed liveness with last-good fallback
//! 4. TelemetryService - Vehicle sensor feed polling and normalization
//! 5. RealtimeHub - WebSocket distribution to dashboard clients
//! 6. WebAPI - REST API endpoints
//!
//! ## Design Principles
//!
//! - The classifier and the stream-state reducer are pure; the service
//!   layer owns all timers and IO
//! - Wire encodings ("1"/"0" flags, loose telemetry types) stay at the
//!   realtime DB boundary

pub mod command_publisher;
pub mod direction_classifier;
pub mod error;
pub mod models;
pub mod realtime_hub;
pub mod state;
pub mod stream_monitor;
pub mod telemetry_service;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;

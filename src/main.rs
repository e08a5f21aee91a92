//! RoverLink Bridge
//!
//! Main entry point for the bridge service.

use roverlink::{
    command_publisher::{CommandPublisher, ControlState},
    realtime_hub::RealtimeHub,
    state::{AppConfig, AppState},
    stream_monitor::{StreamMonitor, StreamProber},
    telemetry_service::TelemetryService,
    web_api,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roverlink=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RoverLink Bridge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    config.stick.validate()?;
    tracing::info!(
        realtime_base_url = %config.realtime_base_url,
        stream_url = %config.stream_url,
        probe_timeout_ms = config.probe_timeout_ms,
        probe_interval_ms = config.probe_interval_ms,
        telemetry_poll_ms = config.telemetry_poll_ms,
        "Configuration loaded"
    );

    // Initialize components
    let realtime = Arc::new(RealtimeHub::new());

    let publisher = Arc::new(CommandPublisher::new(config.realtime_base_url.clone()));
    tracing::info!("CommandPublisher initialized");

    let prober = StreamProber::new(
        config.stream_url.clone(),
        Duration::from_millis(config.probe_timeout_ms),
    );
    let monitor = Arc::new(StreamMonitor::new(
        prober,
        Duration::from_millis(config.probe_interval_ms),
        realtime.clone(),
    ));
    tracing::info!("StreamMonitor initialized, waiting for a viewing session");

    let telemetry = Arc::new(TelemetryService::new(
        config.realtime_base_url.clone(),
        Duration::from_millis(config.telemetry_poll_ms),
        realtime.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        control: Arc::new(RwLock::new(ControlState::default())),
        publisher,
        monitor,
        telemetry: telemetry.clone(),
        realtime,
        started_at: Instant::now(),
    };

    // Park the rover before accepting any input
    state.publisher.publish_logged(&ControlState::default()).await;

    // Start telemetry polling
    telemetry.start().await;
    tracing::info!("TelemetryService started");

    // Create router with static dashboard serving
    let serve_dir = ServeDir::new(&config.static_dir)
        .not_found_service(ServeFile::new(format!("{}/index.html", config.static_dir)));

    let app = web_api::create_router(state.clone())
        .fallback_service(serve_dir)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!(static_dir = %config.static_dir, "Static file serving enabled");

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

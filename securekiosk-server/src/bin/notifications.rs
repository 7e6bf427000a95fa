//! SecureKiosk Notifications - subscription notification receiver.
//!
//! This binary:
//! - Receives signed notifications on production and sandbox routes
//! - Verifies each payload's signature before reading it
//! - Dispatches on the notification type and acknowledges
//!
//! It refuses to start without a verification key.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use securekiosk::web::shutdown_signal;
use securekiosk::{notifications_router, Config, Dispatcher, NotificationState, PayloadVerifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("notification_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.notifications_port,
        environment = %config.environment,
        public_key_configured = config.notification_public_key_path.is_some(),
        shared_secret_configured = config.notification_shared_secret.is_some(),
        bundle_id = ?config.notification_bundle_id,
        max_age_secs = ?config.notification_max_age_secs,
        "config_loaded"
    );

    let verifier =
        PayloadVerifier::from_config(&config).context("Failed to configure payload verification")?;
    info!(verifier = ?verifier, "payload_verifier_ready");

    let port = config.notifications_port;
    let state = NotificationState::new(config, verifier, Dispatcher::default());
    let app = notifications_router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "notification_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("notification_server_shutdown_complete");

    Ok(())
}

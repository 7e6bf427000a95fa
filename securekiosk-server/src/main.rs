//! SecureKiosk API - ad-block rule service.
//!
//! Serves the active ad-block rules (falling back to the default table),
//! and creates and updates rules in the rule store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use securekiosk::web::shutdown_signal;
use securekiosk::{rules_router, Config, DefaultRuleSet, RuleService, RulesState, SqliteRuleStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("api_server_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        port = config.port,
        environment = %config.environment,
        database_max_connections = config.database_max_connections,
        default_rules_path = ?config.default_rules_path,
        cors_origins = ?config.cors_allowed_origins,
        "config_loaded"
    );

    let defaults = DefaultRuleSet::load(config.default_rules_path.as_deref())
        .context("Failed to load default rules")?;
    info!(
        version = defaults.version,
        rule_count = defaults.len(),
        "default_rules_loaded"
    );

    let store = SqliteRuleStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to rule store")?;
    store
        .migrate()
        .await
        .context("Failed to migrate rule store")?;
    let store = Arc::new(store);

    let state = RulesState::new(config.clone(), RuleService::new(store.clone(), defaults));
    let app = rules_router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "api_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    store.close().await;

    info!("api_server_shutdown_complete");

    Ok(())
}

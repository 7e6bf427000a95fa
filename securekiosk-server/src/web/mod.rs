//! HTTP surface for both services.
//!
//! - [`notifications_router`]: signed subscription notification webhooks
//! - [`rules_router`]: the ad-block rule API
//!
//! Both share the health check, the 404 fallback and error rendering.
//! Unsupported methods on a known path get the same JSON 404 as unknown paths.

pub mod error;
pub mod handlers;
pub mod rules;

use std::sync::Arc;

use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::notification::{Dispatcher, PayloadVerifier};
use crate::rules::RuleService;
use crate::Config;

pub use error::{expose_error_details, ApiError, ErrorBody};
pub use handlers::{
    health, not_found, production_notification, sandbox_notification, HealthResponse,
    NotificationResponse, SignedPayloadRequest,
};
pub use rules::{create_rule, list_rules, update_rule};

/// State for the notification receiver.
#[derive(Clone)]
pub struct NotificationState {
    pub config: Arc<Config>,
    pub verifier: Arc<PayloadVerifier>,
    pub dispatcher: Dispatcher,
}

impl NotificationState {
    pub fn new(config: Config, verifier: PayloadVerifier, dispatcher: Dispatcher) -> Self {
        Self {
            config: Arc::new(config),
            verifier: Arc::new(verifier),
            dispatcher,
        }
    }
}

impl FromRef<NotificationState> for Arc<Config> {
    fn from_ref(state: &NotificationState) -> Self {
        state.config.clone()
    }
}

/// State for the rule API.
#[derive(Clone)]
pub struct RulesState {
    pub config: Arc<Config>,
    pub rules: RuleService,
}

impl RulesState {
    pub fn new(config: Config, rules: RuleService) -> Self {
        Self {
            config: Arc::new(config),
            rules,
        }
    }
}

impl FromRef<RulesState> for Arc<Config> {
    fn from_ref(state: &RulesState) -> Self {
        state.config.clone()
    }
}

/// Build the notification receiver router.
pub fn notifications_router(state: NotificationState) -> Router {
    let expose = state.config.expose_error_details();

    Router::new()
        .route("/", get(health).fallback(not_found))
        .route(
            "/notifications/production",
            post(production_notification).fallback(not_found),
        )
        .route(
            "/notifications/sandbox",
            post(sandbox_notification).fallback(not_found),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(expose, expose_error_details))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the rule API router.
pub fn rules_router(state: RulesState) -> Router {
    let expose = state.config.expose_error_details();
    let cors = cors_layer(&state.config);

    let api = Router::new()
        .route(
            "/rules",
            get(list_rules).post(create_rule).fallback(not_found),
        )
        .route("/rules/:id", put(update_rule).fallback(not_found));

    Router::new()
        .route("/", get(health).fallback(not_found))
        .nest("/api/adblock", api)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(expose, expose_error_details))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the rule API; any origin when no allow-list is configured.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match &config.cors_allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "cors_origin_invalid");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(origins))
        }
        _ => layer.allow_origin(Any),
    }
}

/// Create a future that completes when a shutdown signal is received.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("server_shutting_down");
}

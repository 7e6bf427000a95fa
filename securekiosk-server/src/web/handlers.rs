//! Health, fallback and notification webhook handlers.
//!
//! Notification handlers:
//! 1. Verify the signed payload
//! 2. Dispatch on the notification type
//! 3. Acknowledge with `{ "status": "success" }`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use super::error::ApiError;
use super::NotificationState;
use crate::notification::Environment;
use crate::Config;

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

/// Health check endpoint.
pub async fn health(State(config): State<Arc<Config>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Server is running",
        timestamp: Utc::now(),
        environment: config.environment.clone(),
    })
}

/// Fallback for unmatched routes and unsupported methods.
///
/// Reports the full request path, including any prefix a nested router strips.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Route not found", "path": uri.path() })),
    )
}

// =============================================================================
// Subscription Notifications
// =============================================================================

/// Notification webhook body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayloadRequest {
    #[serde(default)]
    pub signed_payload: Option<String>,
}

/// Notification acknowledgement.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub status: &'static str,
}

/// Production notification endpoint.
pub async fn production_notification(
    State(state): State<NotificationState>,
    body: Result<Json<SignedPayloadRequest>, JsonRejection>,
) -> Result<Json<NotificationResponse>, ApiError> {
    receive_notification(&state, Environment::Production, body).await
}

/// Sandbox notification endpoint.
pub async fn sandbox_notification(
    State(state): State<NotificationState>,
    body: Result<Json<SignedPayloadRequest>, JsonRejection>,
) -> Result<Json<NotificationResponse>, ApiError> {
    receive_notification(&state, Environment::Sandbox, body).await
}

async fn receive_notification(
    state: &NotificationState,
    env: Environment,
    body: Result<Json<SignedPayloadRequest>, JsonRejection>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let Json(body) = body?;

    let signed_payload = body
        .signed_payload
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing signed payload"))?;

    info!(
        environment = %env,
        payload_length = signed_payload.len(),
        "notification_received"
    );

    let notification = state.verifier.verify(&signed_payload)?;

    let outcome = state
        .dispatcher
        .dispatch(env, &notification)
        .await
        .map_err(|e| {
            error!(environment = %env, error = %e, "notification_dispatch_failed");
            ApiError::from(e)
        })?;

    info!(environment = %env, outcome = ?outcome, "notification_processed");

    Ok(Json(NotificationResponse { status: "success" }))
}

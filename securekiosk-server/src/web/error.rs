//! HTTP error responses.
//!
//! Every error renders as `{ "message": ... }`. Internal detail travels on the
//! response as an [`ErrorDetail`] extension and is only written into the body
//! by [`expose_error_details`] outside production.

use std::fmt::Display;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::notification::{DispatchError, VerifyError};
use crate::rules::RuleError;

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full error body, including detail, attached to error responses.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub ErrorBody);

/// An error returned from a handler.
#[derive(Debug)]
pub enum ApiError {
    /// Client input was missing or invalid.
    BadRequest {
        message: String,
        detail: Option<String>,
    },

    /// The request could not be authenticated.
    Unauthorized(String),

    NotFound(String),

    /// An unexpected failure; `detail` is never shown in production.
    Internal { message: String, detail: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal(message: impl Into<String>, detail: impl Display) -> Self {
        ApiError::Internal {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    /// Map a rule operation failure, using `context` as the message for store errors.
    pub fn from_rule_error(err: RuleError, context: &str) -> Self {
        match err {
            RuleError::Validation(message) => ApiError::bad_request(message),
            RuleError::NotFound(message) => ApiError::NotFound(message),
            RuleError::Store(e) => ApiError::internal(context, e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            message: "Invalid JSON body".to_string(),
            detail: Some(rejection.body_text()),
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Malformed(detail) => {
                warn!(error = %detail, "notification_payload_malformed");
                ApiError::BadRequest {
                    message: "Invalid JWT format".to_string(),
                    detail: Some(detail),
                }
            }
            VerifyError::NotConfigured | VerifyError::Key { .. } => {
                ApiError::internal("Notification verification unavailable", err)
            }
            other => {
                warn!(error = %other, "notification_payload_rejected");
                ApiError::Unauthorized("Notification signature verification failed".to_string())
            }
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        ApiError::internal("Internal server error", err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            ApiError::BadRequest { message, detail } => (StatusCode::BAD_REQUEST, message, detail),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message, None),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            ApiError::Internal { message, detail } => {
                error!(context = %message, error = %detail, "internal_server_error");
                (StatusCode::INTERNAL_SERVER_ERROR, message, Some(detail))
            }
        };

        let public = ErrorBody {
            message: message.clone(),
            error: None,
        };
        let mut response = (status, Json(public)).into_response();

        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(ErrorBody {
                message,
                error: Some(detail),
            }));
        }

        response
    }
}

/// Middleware that writes error detail into the body when `expose` is set.
pub async fn expose_error_details(
    State(expose): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let detail = response.extensions_mut().remove::<ErrorDetail>();

    match detail {
        Some(ErrorDetail(body)) if expose => (response.status(), Json(body)).into_response(),
        _ => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("x".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::internal("x", "boom").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_detail_carried_as_extension() {
        let response = ApiError::internal("Error fetching ad block rules", "disk full").into_response();
        let detail = response.extensions().get::<ErrorDetail>().unwrap();
        assert_eq!(detail.0.message, "Error fetching ad block rules");
        assert_eq!(detail.0.error.as_deref(), Some("disk full"));

        let response = ApiError::NotFound("Rule not found".to_string()).into_response();
        assert!(response.extensions().get::<ErrorDetail>().is_none());
    }

    #[test]
    fn test_rule_error_mapping() {
        assert!(matches!(
            ApiError::from_rule_error(RuleError::Validation("Trigger is required".into()), "ctx"),
            ApiError::BadRequest { .. }
        ));
        assert!(matches!(
            ApiError::from_rule_error(RuleError::NotFound("Rule not found".into()), "ctx"),
            ApiError::NotFound(_)
        ));
        match ApiError::from_rule_error(
            RuleError::Store(StoreError::NotFound("x".into())),
            "Error updating ad block rule",
        ) {
            ApiError::Internal { message, .. } => assert_eq!(message, "Error updating ad block rule"),
            other => panic!("Expected internal error, got {other:?}"),
        }
    }

    #[test]
    fn test_verify_error_mapping() {
        assert!(matches!(
            ApiError::from(VerifyError::Malformed("bad".into())),
            ApiError::BadRequest { .. }
        ));
        assert!(matches!(
            ApiError::from(VerifyError::InvalidSignature("bad".into())),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(VerifyError::Stale),
            ApiError::Unauthorized(_)
        ));
    }
}

//! Subscription notification types.
//!
//! These mirror the claims carried inside a signed notification payload.
//! Only the fields the receiver reads are modelled; everything else in the
//! payload is ignored during deserialization.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which webhook route a notification arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `notificationType` claim.
///
/// Unrecognised values are kept verbatim so they can be logged.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum NotificationType {
    Subscribed,
    DidRenew,
    DidFailToRenew,
    Expired,
    Other(String),
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "SUBSCRIBED" => NotificationType::Subscribed,
            "DID_RENEW" => NotificationType::DidRenew,
            "DID_FAIL_TO_RENEW" => NotificationType::DidFailToRenew,
            "EXPIRED" => NotificationType::Expired,
            _ => NotificationType::Other(value),
        }
    }
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Subscribed => "SUBSCRIBED",
            NotificationType::DidRenew => "DID_RENEW",
            NotificationType::DidFailToRenew => "DID_FAIL_TO_RENEW",
            NotificationType::Expired => "EXPIRED",
            NotificationType::Other(raw) => raw,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded notification payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub notification_type: Option<NotificationType>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default, rename = "notificationUUID")]
    pub notification_uuid: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub signed_date: Option<i64>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

/// The `data` record of a notification.
///
/// Date and intent fields are passed through untyped; they are only logged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default)]
    pub original_transaction_id: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<Value>,
    #[serde(default)]
    pub renewal_date: Option<Value>,
    #[serde(default)]
    pub expiration_intent: Option<Value>,
    #[serde(default)]
    pub expiration_date: Option<Value>,
}

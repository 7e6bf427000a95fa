//! Signed notification payload verification.
//!
//! Notifications arrive as a compact JWS. The payload is only trusted after
//! its signature verifies against the configured key; nothing is dispatched
//! from an unverified token.
//!
//! Verification pins a single key. The `x5c` certificate chain in the JWS
//! header is not evaluated, so when the signer rotates its leaf certificate
//! the new public key has to be deployed at `NOTIFICATION_PUBLIC_KEY_PATH`
//! before payloads signed with it are accepted.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use thiserror::Error;
use tracing::warn;

use super::types::Notification;
use crate::Config;

/// Reasons a signed payload is refused.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no notification verification key configured")]
    NotConfigured,

    #[error("failed to load verification key from {path}: {reason}")]
    Key { path: PathBuf, reason: String },

    #[error("malformed signed payload: {0}")]
    Malformed(String),

    #[error("signature verification failed: {0}")]
    InvalidSignature(String),

    #[error("bundle id mismatch: expected {expected}, got {actual:?}")]
    BundleMismatch {
        expected: String,
        actual: Option<String>,
    },

    #[error("signed payload is stale")]
    Stale,
}

/// Verifies signed notification payloads against a trusted key.
#[derive(Clone)]
pub struct PayloadVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    bundle_id: Option<String>,
    max_age_secs: Option<u64>,
}

impl std::fmt::Debug for PayloadVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("bundle_id", &self.bundle_id)
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

impl PayloadVerifier {
    /// Build a verifier from configuration.
    ///
    /// An EC public key (ES256) takes precedence over a shared secret (HS256).
    pub fn from_config(config: &Config) -> Result<Self, VerifyError> {
        let verifier = if let Some(path) = &config.notification_public_key_path {
            let pem = fs::read(path).map_err(|e| VerifyError::Key {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            let key = DecodingKey::from_ec_pem(&pem).map_err(|e| VerifyError::Key {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            Self::new(key, Algorithm::ES256)
        } else if let Some(secret) = &config.notification_shared_secret {
            Self::new(DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
        } else {
            return Err(VerifyError::NotConfigured);
        };

        Ok(verifier
            .with_bundle_id(config.notification_bundle_id.clone())
            .with_max_age(config.notification_max_age_secs))
    }

    /// Create a verifier for a single key and algorithm.
    pub fn new(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        // Notification payloads carry no registered claims.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_aud = false;

        Self {
            decoding_key,
            validation,
            bundle_id: None,
            max_age_secs: None,
        }
    }

    /// Require `data.bundleId` to match.
    pub fn with_bundle_id(mut self, bundle_id: Option<String>) -> Self {
        self.bundle_id = bundle_id;
        self
    }

    /// Reject payloads whose `signedDate` is older than `max_age_secs`.
    pub fn with_max_age(mut self, max_age_secs: Option<u64>) -> Self {
        self.max_age_secs = max_age_secs;
        self
    }

    /// Verify a signed payload and return its decoded notification.
    pub fn verify(&self, signed_payload: &str) -> Result<Notification, VerifyError> {
        let token = decode::<Notification>(signed_payload, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_) => VerifyError::Malformed(e.to_string()),
                _ => VerifyError::InvalidSignature(e.to_string()),
            })?;

        let notification = token.claims;
        self.check_bundle(&notification)?;
        self.check_age(&notification)?;

        Ok(notification)
    }

    fn check_bundle(&self, notification: &Notification) -> Result<(), VerifyError> {
        let Some(expected) = &self.bundle_id else {
            return Ok(());
        };

        let actual = notification
            .data
            .as_ref()
            .and_then(|d| d.bundle_id.clone());

        if actual.as_deref() != Some(expected.as_str()) {
            warn!(
                expected_bundle_id = %expected,
                actual_bundle_id = ?actual,
                "notification_bundle_mismatch"
            );
            return Err(VerifyError::BundleMismatch {
                expected: expected.clone(),
                actual,
            });
        }

        Ok(())
    }

    fn check_age(&self, notification: &Notification) -> Result<(), VerifyError> {
        let Some(max_age_secs) = self.max_age_secs else {
            return Ok(());
        };

        let Some(signed_date) = notification.signed_date else {
            warn!("notification_signed_date_missing");
            return Err(VerifyError::Stale);
        };

        let now = Utc::now().timestamp_millis();
        let age_secs = now.abs_diff(signed_date) / 1000;

        if age_secs > max_age_secs {
            warn!(
                signed_date = signed_date,
                current_time = now,
                age_seconds = age_secs,
                max_age_seconds = max_age_secs,
                "notification_signature_stale"
            );
            return Err(VerifyError::Stale);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::NotificationType;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    const SECRET: &str = "test-notification-secret";

    fn sign(claims: &Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier() -> PayloadVerifier {
        PayloadVerifier::new(DecodingKey::from_secret(SECRET.as_bytes()), Algorithm::HS256)
    }

    #[test]
    fn test_verify_valid_payload() {
        let token = sign(
            &json!({
                "notificationType": "DID_RENEW",
                "data": { "originalTransactionId": "1000", "productId": "pro" }
            }),
            SECRET,
        );

        let notification = verifier().verify(&token).unwrap();
        assert_eq!(notification.notification_type, Some(NotificationType::DidRenew));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let token = sign(&json!({ "notificationType": "EXPIRED" }), "someone-else");
        assert!(matches!(
            verifier().verify(&token),
            Err(VerifyError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_verify_malformed_token() {
        assert!(matches!(
            verifier().verify("not-a-jwt"),
            Err(VerifyError::Malformed(_))
        ));
    }

    #[test]
    fn test_verify_unsigned_token_rejected() {
        // Header {"alg":"none"} with an empty signature segment.
        let token = "eyJhbGciOiJub25lIn0.eyJub3RpZmljYXRpb25UeXBlIjoiU1VCU0NSSUJFRCJ9.";
        assert!(verifier().verify(token).is_err());
    }

    #[test]
    fn test_verify_bundle_mismatch() {
        let verifier = verifier().with_bundle_id(Some("app.securekiosk".to_string()));

        let good = sign(
            &json!({ "notificationType": "SUBSCRIBED", "data": { "bundleId": "app.securekiosk" } }),
            SECRET,
        );
        assert!(verifier.verify(&good).is_ok());

        let bad = sign(
            &json!({ "notificationType": "SUBSCRIBED", "data": { "bundleId": "com.other" } }),
            SECRET,
        );
        assert!(matches!(
            verifier.verify(&bad),
            Err(VerifyError::BundleMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_stale() {
        let verifier = verifier().with_max_age(Some(300));

        // Year 2000
        let stale = sign(
            &json!({ "notificationType": "SUBSCRIBED", "signedDate": 946_684_800_000i64 }),
            SECRET,
        );
        assert!(matches!(verifier.verify(&stale), Err(VerifyError::Stale)));

        let missing = sign(&json!({ "notificationType": "SUBSCRIBED" }), SECRET);
        assert!(matches!(verifier.verify(&missing), Err(VerifyError::Stale)));

        let fresh = sign(
            &json!({ "notificationType": "SUBSCRIBED", "signedDate": Utc::now().timestamp_millis() }),
            SECRET,
        );
        assert!(verifier.verify(&fresh).is_ok());
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = Config::default();
        assert!(matches!(
            PayloadVerifier::from_config(&config),
            Err(VerifyError::NotConfigured)
        ));

        let config = Config {
            notification_shared_secret: Some(SECRET.to_string()),
            ..Config::default()
        };
        assert!(PayloadVerifier::from_config(&config).is_ok());
    }

    #[test]
    fn test_from_config_missing_key_file() {
        let config = Config {
            notification_public_key_path: Some(PathBuf::from("/nonexistent/key.pem")),
            ..Config::default()
        };
        assert!(matches!(
            PayloadVerifier::from_config(&config),
            Err(VerifyError::Key { .. })
        ));
    }
}

//! Configuration module for environment variable parsing.
//!
//! Both binaries read the same [`Config`]; each uses the subset it needs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

/// Environment name that suppresses internal error detail in responses.
pub const PRODUCTION: &str = "production";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the rule API to listen on
    pub port: u16,

    /// Port for the notification receiver to listen on
    pub notifications_port: u16,

    /// Deployment environment name (`development`, `production`, ...)
    pub environment: String,

    // =========================================================================
    // Rule Store
    // =========================================================================

    /// Store connection string
    pub database_url: String,

    /// Maximum number of pooled store connections
    pub database_max_connections: u32,

    /// Optional JSON file replacing the built-in default rule table
    pub default_rules_path: Option<PathBuf>,

    /// Optional list of origins allowed by CORS; permissive when unset
    pub cors_allowed_origins: Option<Vec<String>>,

    // =========================================================================
    // Notification Verification
    // =========================================================================

    /// PEM-encoded EC public key for ES256 signed payloads
    pub notification_public_key_path: Option<PathBuf>,

    /// Shared secret for HS256 signed payloads
    pub notification_shared_secret: Option<String>,

    /// Expected `bundleId` inside notification data
    pub notification_bundle_id: Option<String>,

    /// Maximum accepted age of a payload's `signedDate`, in seconds
    pub notification_max_age_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            notifications_port: parse_or("NOTIFICATIONS_PORT", 3000),

            environment: non_empty("APP_ENV").unwrap_or_else(|| "development".to_string()),

            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://securekiosk.db".to_string()),

            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5),

            default_rules_path: non_empty("DEFAULT_RULES_PATH").map(PathBuf::from),

            cors_allowed_origins: parse_csv("CORS_ALLOWED_ORIGINS"),

            notification_public_key_path: non_empty("NOTIFICATION_PUBLIC_KEY_PATH")
                .map(PathBuf::from),

            notification_shared_secret: non_empty("NOTIFICATION_SHARED_SECRET"),

            notification_bundle_id: non_empty("NOTIFICATION_BUNDLE_ID"),

            notification_max_age_secs: parse_optional("NOTIFICATION_MAX_AGE_SECS"),
        }
    }

    /// Whether the service runs in the production environment.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION)
    }

    /// Whether internal error detail may be echoed back to clients.
    pub fn expose_error_details(&self) -> bool {
        !self.is_production()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            notifications_port: 3000,
            environment: "development".to_string(),
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            default_rules_path: None,
            cors_allowed_origins: None,
            notification_public_key_path: None,
            notification_shared_secret: None,
            notification_bundle_id: None,
            notification_max_age_secs: None,
        }
    }
}

/// Read a variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional typed variable, warning on malformed values.
fn parse_optional<T: FromStr>(name: &str) -> Option<T> {
    let raw = non_empty(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, ignoring");
            None
        }
    }
}

/// Parse a typed variable with a fallback default.
fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    parse_optional(name).unwrap_or(default)
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

//! SecureKiosk server - subscription notifications and ad-block rules.
//!
//! This library provides shared modules for the two SecureKiosk binaries:
//! - `securekiosk-api`: ad-block rule API backed by the rule store
//! - `securekiosk-notifications`: receiver for signed subscription notifications
//!
//! ## Architecture
//!
//! ```text
//! Signed payload → Notification receiver → PayloadVerifier → Dispatcher → handler
//! Rule request   → Rule API → validation → RuleService → RuleStore (SQLite)
//! ```

pub mod config;
pub mod notification;
pub mod rules;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use notification::{Dispatcher, Environment, LoggingHandler, Notification, PayloadVerifier};
pub use rules::{AdBlockRule, DefaultRuleSet, RuleService};
pub use store::{RuleStore, SqliteRuleStore};
pub use web::{notifications_router, rules_router, NotificationState, RulesState};

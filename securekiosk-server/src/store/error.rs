//! Errors raised by the rule store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No rule exists with the given id.
    #[error("rule not found: {0}")]
    NotFound(String),

    #[error("database operation failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be mapped back to a rule.
    #[error("stored rule {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
}

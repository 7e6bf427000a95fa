//! Persistence for ad-block rules.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::StoreError;
pub use sqlite::SqliteRuleStore;
pub use traits::RuleStore;

#[cfg(test)]
pub use traits::MockRuleStore;

//! Storage interface for ad-block rules.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::StoreError;
use crate::rules::{AdBlockRule, DefaultRuleSet, NewRule, RulePatch};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// All rules with `isActive = true`, oldest first.
    async fn list_active(&self) -> Result<Vec<AdBlockRule>, StoreError>;

    /// Persist a new rule, assigning its id and timestamps.
    async fn insert(&self, rule: NewRule) -> Result<AdBlockRule, StoreError>;

    /// Apply the supplied fields to an existing rule and refresh its timestamps.
    ///
    /// `id` may also be the key of a seeded default rule, which is the id
    /// the in-memory default table is served under.
    /// Returns [`StoreError::NotFound`] when nothing matches.
    async fn update(&self, id: &str, patch: RulePatch) -> Result<AdBlockRule, StoreError>;

    /// Insert any default rules whose key is not already present.
    ///
    /// Idempotent: concurrent or repeated calls never duplicate a key.
    /// Returns the number of rows inserted.
    async fn seed_defaults(&self, defaults: &DefaultRuleSet) -> Result<u64, StoreError>;
}

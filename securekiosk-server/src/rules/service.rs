//! Rule operations exposed to the HTTP layer.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::defaults::DefaultRuleSet;
use super::model::{AdBlockRule, CreateRuleRequest, UpdateRuleRequest};
use super::validation::{validate_new_rule, validate_patch};
use super::RuleError;
use crate::store::{RuleStore, StoreError};

/// Validation and defaulting in front of a [`RuleStore`].
#[derive(Clone)]
pub struct RuleService {
    store: Arc<dyn RuleStore>,
    defaults: Arc<DefaultRuleSet>,
}

impl RuleService {
    pub fn new(store: Arc<dyn RuleStore>, defaults: DefaultRuleSet) -> Self {
        Self {
            store,
            defaults: Arc::new(defaults),
        }
    }

    pub fn defaults(&self) -> &DefaultRuleSet {
        &self.defaults
    }

    /// Active rules, falling back to the default table when none exist.
    ///
    /// The fallback is seeded into the store on a best-effort basis; a
    /// seeding failure is logged and the in-memory table is served instead.
    /// Served defaults carry their key as id, which [`RuleStore::update`]
    /// resolves to the seeded row.
    pub async fn list_active(&self) -> Result<Vec<AdBlockRule>, RuleError> {
        let rules = self.store.list_active().await?;
        if !rules.is_empty() {
            return Ok(rules.into_iter().map(AdBlockRule::ensure_id).collect());
        }

        let rules = self.seed_and_reload().await;
        let rules = if rules.is_empty() {
            self.defaults.to_rules(Utc::now())
        } else {
            rules
        };

        Ok(rules.into_iter().map(AdBlockRule::ensure_id).collect())
    }

    async fn seed_and_reload(&self) -> Vec<AdBlockRule> {
        match self.store.seed_defaults(&self.defaults).await {
            Ok(inserted) => info!(
                inserted,
                version = self.defaults.version,
                "default_rules_seeded"
            ),
            Err(e) => {
                warn!(error = %e, "default_rules_seed_failed");
                return Vec::new();
            }
        }

        match self.store.list_active().await {
            Ok(rules) => rules,
            Err(e) => {
                warn!(error = %e, "default_rules_reload_failed");
                Vec::new()
            }
        }
    }

    /// Validate and persist a new rule.
    pub async fn create(&self, req: CreateRuleRequest) -> Result<AdBlockRule, RuleError> {
        let rule = validate_new_rule(req)?;
        let created = self.store.insert(rule).await?;

        info!(
            rule_id = %created.id,
            action = %created.action,
            category = %created.category,
            "rule_created"
        );

        Ok(created.ensure_id())
    }

    /// Apply a partial update to an existing rule.
    pub async fn update(&self, id: &str, req: UpdateRuleRequest) -> Result<AdBlockRule, RuleError> {
        let patch = validate_patch(req)?;
        let updated = self.store.update(id, patch).await.map_err(|e| match e {
            StoreError::NotFound(_) => RuleError::NotFound("Rule not found".to_string()),
            other => RuleError::Store(other),
        })?;

        info!(rule_id = %updated.id, "rule_updated");

        Ok(updated.ensure_id())
    }
}

//! SQLite-backed rule store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use tracing::{debug, info};

use super::error::StoreError;
use super::traits::RuleStore;
use crate::rules::{generate_id, AdBlockRule, DefaultRuleSet, NewRule, RulePatch};

/// SQL query constants for rule operations
mod rule_sql {
    pub const SELECT_ACTIVE: &str = "SELECT id, pattern, action, category, is_active, description, last_updated, created_at, updated_at FROM adblock_rules WHERE is_active = 1 ORDER BY rowid";

    pub const INSERT: &str = "INSERT INTO adblock_rules (id, seed_key, pattern, action, category, is_active, description, last_updated, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

    /// Seeding relies on the unique `seed_key` to stay idempotent.
    pub const INSERT_SEED: &str = "INSERT INTO adblock_rules (id, seed_key, pattern, action, category, is_active, description, last_updated, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) ON CONFLICT(seed_key) DO NOTHING";

    /// Targets a rule by id, or a seeded default by its key; an exact id match wins.
    pub const UPDATE: &str = "UPDATE adblock_rules SET pattern = COALESCE(?, pattern), action = COALESCE(?, action), category = COALESCE(?, category), is_active = COALESCE(?, is_active), description = COALESCE(?, description), last_updated = ?, updated_at = ? WHERE rowid = (SELECT rowid FROM adblock_rules WHERE id = ? OR seed_key = ? ORDER BY id = ? DESC LIMIT 1) RETURNING id, pattern, action, category, is_active, description, last_updated, created_at, updated_at";
}

/// A [`RuleStore`] over a SQLite connection pool.
pub struct SqliteRuleStore {
    pool: SqlitePool,
}

impl SqliteRuleStore {
    /// Connect to the database, creating the file if it does not exist.
    #[tracing::instrument(level = "info")]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        debug!(database_url, "store_connecting");
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        if database_url.contains(":memory:") {
            // An in-memory database lives only as long as its connection.
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        info!(database_url, "store_connected");
        Ok(Self { pool })
    }

    /// Open an in-memory store with the schema applied.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let store = Self::connect("sqlite::memory:", 1).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Run embedded schema migrations.
    #[tracing::instrument(skip(self), level = "info")]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("store_migrations_applied");
        Ok(())
    }

    /// Close the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("store_closed");
    }
}

fn rule_from_row(row: &SqliteRow) -> Result<AdBlockRule, StoreError> {
    let id: String = row.try_get("id")?;
    let action: String = row.try_get("action")?;
    let category: String = row.try_get("category")?;

    let corrupt = |reason: String| StoreError::Corrupt {
        id: id.clone(),
        reason,
    };

    Ok(AdBlockRule {
        action: action.parse().map_err(|e| corrupt(format!("{e}")))?,
        category: category.parse().map_err(|e| corrupt(format!("{e}")))?,
        trigger: row.try_get("pattern")?,
        is_active: row.try_get("is_active")?,
        description: row.try_get("description")?,
        last_updated: row.try_get("last_updated")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        id,
    })
}

#[async_trait]
impl RuleStore for SqliteRuleStore {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn list_active(&self) -> Result<Vec<AdBlockRule>, StoreError> {
        let rows = sqlx::query(rule_sql::SELECT_ACTIVE)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(rule_from_row).collect()
    }

    #[tracing::instrument(skip(self, rule), level = "debug")]
    async fn insert(&self, rule: NewRule) -> Result<AdBlockRule, StoreError> {
        let now = Utc::now();
        let id = generate_id();

        sqlx::query(rule_sql::INSERT)
            .bind(&id)
            .bind(None::<String>)
            .bind(&rule.trigger)
            .bind(rule.action.as_str())
            .bind(rule.category.as_str())
            .bind(rule.is_active)
            .bind(&rule.description)
            .bind(now)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await?;

        debug!(rule_id = %id, "rule_inserted");

        Ok(AdBlockRule {
            id,
            trigger: rule.trigger,
            action: rule.action,
            category: rule.category,
            is_active: rule.is_active,
            description: rule.description,
            last_updated: now,
            created_at: now,
            updated_at: now,
        })
    }

    #[tracing::instrument(skip(self, patch), level = "debug")]
    async fn update(&self, id: &str, patch: RulePatch) -> Result<AdBlockRule, StoreError> {
        let now = Utc::now();

        let row = sqlx::query(rule_sql::UPDATE)
            .bind(patch.trigger)
            .bind(patch.action.map(|a| a.as_str()))
            .bind(patch.category.map(|c| c.as_str()))
            .bind(patch.is_active)
            .bind(patch.description)
            .bind(now)
            .bind(now)
            .bind(id)
            .bind(id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => rule_from_row(&row),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    #[tracing::instrument(skip(self, defaults), fields(version = defaults.version), level = "debug")]
    async fn seed_defaults(&self, defaults: &DefaultRuleSet) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for default in &defaults.rules {
            let rule = default.to_new_rule();
            let result = sqlx::query(rule_sql::INSERT_SEED)
                .bind(generate_id())
                .bind(&default.key)
                .bind(&rule.trigger)
                .bind(rule.action.as_str())
                .bind(rule.category.as_str())
                .bind(rule.is_active)
                .bind(&rule.description)
                .bind(now)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleAction, RuleCategory};

    async fn setup_store() -> SqliteRuleStore {
        SqliteRuleStore::in_memory()
            .await
            .expect("Failed to open in-memory store")
    }

    fn new_rule(trigger: &str) -> NewRule {
        NewRule {
            trigger: trigger.to_string(),
            action: RuleAction::Hide,
            category: RuleCategory::Tracking,
            is_active: true,
            description: Some("test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let store = setup_store().await;
        assert!(store.list_active().await.unwrap().is_empty());

        let created = store.insert(new_rule("^a$")).await.unwrap();
        assert_eq!(created.id.len(), 32);

        let rules = store.list_active().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, created.id);
        assert_eq!(rules[0].trigger, "^a$");
        assert_eq!(rules[0].action, RuleAction::Hide);
        assert_eq!(rules[0].category, RuleCategory::Tracking);
        assert_eq!(rules[0].description.as_deref(), Some("test"));
    }

    #[tokio::test]
    async fn test_list_excludes_inactive() {
        let store = setup_store().await;
        let first = store.insert(new_rule("^a$")).await.unwrap();
        store.insert(new_rule("^b$")).await.unwrap();

        store
            .update(
                &first.id,
                RulePatch {
                    is_active: Some(false),
                    ..RulePatch::default()
                },
            )
            .await
            .unwrap();

        let rules = store.list_active().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger, "^b$");
    }

    #[tokio::test]
    async fn test_update_partial_fields() {
        let store = setup_store().await;
        let created = store.insert(new_rule("^a$")).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let updated = store
            .update(
                &created.id,
                RulePatch {
                    description: Some("changed".to_string()),
                    ..RulePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.trigger, created.trigger);
        assert_eq!(updated.action, created.action);
        assert_eq!(updated.category, created.category);
        assert_eq!(updated.description.as_deref(), Some("changed"));
        assert!(updated.last_updated > created.last_updated);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = setup_store().await;
        let created = store.insert(new_rule("^a$")).await.unwrap();

        let result = store
            .update(
                "does-not-exist",
                RulePatch {
                    trigger: Some("^z$".to_string()),
                    ..RulePatch::default()
                },
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        let rules = store.list_active().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, created.id);
        assert_eq!(rules[0].trigger, "^a$");
    }

    #[tokio::test]
    async fn test_update_seeded_rule_by_key() {
        let store = setup_store().await;
        let defaults = DefaultRuleSet::builtin().unwrap();
        store.seed_defaults(&defaults).await.unwrap();
        let seeded = store.list_active().await.unwrap();

        let key = &defaults.rules[0].key;
        let updated = store
            .update(
                key,
                RulePatch {
                    description: Some("by key".to_string()),
                    ..RulePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, seeded[0].id);
        assert_eq!(updated.description.as_deref(), Some("by key"));
        assert_eq!(store.list_active().await.unwrap().len(), defaults.len());
    }

    #[tokio::test]
    async fn test_update_by_id_ignores_other_rows() {
        let store = setup_store().await;
        store
            .seed_defaults(&DefaultRuleSet::builtin().unwrap())
            .await
            .unwrap();
        let created = store.insert(new_rule("^a$")).await.unwrap();

        let updated = store
            .update(
                &created.id,
                RulePatch {
                    is_active: Some(false),
                    ..RulePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);

        let rules = store.list_active().await.unwrap();
        assert!(rules.iter().all(|r| r.id != created.id));
        assert!(rules.iter().all(|r| r.is_active));
    }

    #[tokio::test]
    async fn test_seed_defaults_is_idempotent() {
        let store = setup_store().await;
        let defaults = DefaultRuleSet::builtin().unwrap();

        let inserted = store.seed_defaults(&defaults).await.unwrap();
        assert_eq!(inserted, defaults.len() as u64);

        let inserted = store.seed_defaults(&defaults).await.unwrap();
        assert_eq!(inserted, 0);

        let rules = store.list_active().await.unwrap();
        assert_eq!(rules.len(), defaults.len());
        for (rule, default) in rules.iter().zip(&defaults.rules) {
            assert_eq!(rule.trigger, default.trigger);
            assert_eq!(rule.category, default.category);
            assert!(!rule.id.is_empty());
        }
    }
}

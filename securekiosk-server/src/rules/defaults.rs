//! The default rule table.
//!
//! Served (and seeded into the store) whenever no active custom rules exist.
//! The built-in table is compiled in; a JSON file with the same shape can
//! replace it at startup without a rebuild.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use super::model::{AdBlockRule, NewRule, RuleAction, RuleCategory};

const BUILTIN_RULES: &str = include_str!("../../config/default_rules.json");

#[derive(Debug, Error)]
pub enum DefaultRulesError {
    #[error("failed to read default rules from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse default rules: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid default rule table: {0}")]
    Invalid(String),
}

/// One entry of the default table, keyed by a stable identifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefaultRule {
    pub key: String,
    pub trigger: String,
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default)]
    pub category: RuleCategory,
    #[serde(default)]
    pub description: Option<String>,
}

impl DefaultRule {
    pub fn to_new_rule(&self) -> NewRule {
        NewRule {
            trigger: self.trigger.clone(),
            action: self.action,
            category: self.category,
            is_active: true,
            description: self.description.clone(),
        }
    }
}

/// A versioned set of default rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefaultRuleSet {
    pub version: u32,
    pub rules: Vec<DefaultRule>,
}

impl DefaultRuleSet {
    /// The table compiled into the binary.
    pub fn builtin() -> Result<Self, DefaultRulesError> {
        Self::from_json(BUILTIN_RULES)
    }

    /// Load a table from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, DefaultRulesError> {
        let raw = fs::read_to_string(path).map_err(|source| DefaultRulesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Load from `path` if given, else the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self, DefaultRulesError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, DefaultRulesError> {
        let set: DefaultRuleSet = serde_json::from_str(raw)?;
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), DefaultRulesError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.key.trim().is_empty() {
                return Err(DefaultRulesError::Invalid("rule with empty key".to_string()));
            }
            if !seen.insert(rule.key.as_str()) {
                return Err(DefaultRulesError::Invalid(format!(
                    "duplicate key '{}'",
                    rule.key
                )));
            }
            Regex::new(&rule.trigger).map_err(|e| {
                DefaultRulesError::Invalid(format!("rule '{}' has invalid trigger: {e}", rule.key))
            })?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Materialize the table as API records, using each key as the id.
    pub fn to_rules(&self, now: DateTime<Utc>) -> Vec<AdBlockRule> {
        self.rules
            .iter()
            .map(|rule| AdBlockRule {
                id: rule.key.clone(),
                trigger: rule.trigger.clone(),
                action: rule.action,
                category: rule.category,
                is_active: true,
                description: rule.description.clone(),
                last_updated: now,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }
}

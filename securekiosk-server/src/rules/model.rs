//! Ad-block rule records and request shapes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::RuleError;

/// What a client does when a rule's trigger matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    #[default]
    Block,
    Hide,
    Redirect,
}

impl RuleAction {
    pub const ALL: [RuleAction; 3] = [RuleAction::Block, RuleAction::Hide, RuleAction::Redirect];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Block => "block",
            RuleAction::Hide => "hide",
            RuleAction::Redirect => "redirect",
        }
    }
}

/// Grouping tag for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Ads,
    Tracking,
    Malware,
    Adult,
    #[default]
    Custom,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 5] = [
        RuleCategory::Ads,
        RuleCategory::Tracking,
        RuleCategory::Malware,
        RuleCategory::Adult,
        RuleCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Ads => "ads",
            RuleCategory::Tracking => "tracking",
            RuleCategory::Malware => "malware",
            RuleCategory::Adult => "adult",
            RuleCategory::Custom => "custom",
        }
    }
}

macro_rules! closed_enum_str {
    ($ty:ident, $field:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = RuleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $ty::ALL.iter().map(|v| v.as_str()).collect();
                        RuleError::Validation(format!(
                            "Invalid {} '{}', expected one of: {}",
                            $field,
                            s,
                            allowed.join(", ")
                        ))
                    })
            }
        }
    };
}

closed_enum_str!(RuleAction, "action");
closed_enum_str!(RuleCategory, "category");

/// A persisted ad-block rule as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdBlockRule {
    pub id: String,
    pub trigger: String,
    pub action: RuleAction,
    pub category: RuleCategory,
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdBlockRule {
    /// Guarantee a non-empty identifier, synthesizing a random one if needed.
    pub fn ensure_id(mut self) -> Self {
        if self.id.trim().is_empty() {
            self.id = generate_id();
        }
        self
    }
}

/// A validated rule ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRule {
    pub trigger: String,
    pub action: RuleAction,
    pub category: RuleCategory,
    pub is_active: bool,
    pub description: Option<String>,
}

/// A validated partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulePatch {
    pub trigger: Option<String>,
    pub action: Option<RuleAction>,
    pub category: Option<RuleCategory>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

/// Body of `POST /api/adblock/rules`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRuleRequest {
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `PUT /api/adblock/rules/:id`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRuleRequest {
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Random 128-bit identifier, hex encoded.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(id: &str) -> AdBlockRule {
        let now = Utc::now();
        AdBlockRule {
            id: id.to_string(),
            trigger: ".*ads\\..*".to_string(),
            action: RuleAction::Block,
            category: RuleCategory::Ads,
            is_active: true,
            description: None,
            last_updated: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("hide".parse::<RuleAction>().unwrap(), RuleAction::Hide);
        assert_eq!("malware".parse::<RuleCategory>().unwrap(), RuleCategory::Malware);
        assert!("BLOCK".parse::<RuleAction>().is_err());

        let err = "spam".parse::<RuleCategory>().unwrap_err();
        assert!(err.to_string().contains("ads, tracking, malware, adult, custom"));
    }

    #[test]
    fn test_enum_defaults() {
        assert_eq!(RuleAction::default(), RuleAction::Block);
        assert_eq!(RuleCategory::default(), RuleCategory::Custom);
    }

    #[test]
    fn test_ensure_id_keeps_existing() {
        assert_eq!(rule("abc").ensure_id().id, "abc");
    }

    #[test]
    fn test_ensure_id_synthesizes() {
        let first = rule("").ensure_id();
        let second = rule("  ").ensure_id();
        assert_eq!(first.id.len(), 32);
        assert!(first.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_rule_serialization_shape() {
        let value = serde_json::to_value(rule("r1")).unwrap();
        assert_eq!(value["id"], json!("r1"));
        assert_eq!(value["action"], json!("block"));
        assert_eq!(value["category"], json!("ads"));
        assert_eq!(value["isActive"], json!(true));
        assert!(value.get("lastUpdated").is_some());
        assert!(value["description"].is_null());
    }

    #[test]
    fn test_update_request_camel_case() {
        let req: UpdateRuleRequest =
            serde_json::from_value(json!({ "isActive": false, "_id": "ignored" })).unwrap();
        assert_eq!(req.is_active, Some(false));
        assert!(req.trigger.is_none());
    }
}

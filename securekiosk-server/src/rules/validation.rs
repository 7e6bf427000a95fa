//! Request validation for rule creation and updates.

use regex::Regex;

use super::model::{CreateRuleRequest, NewRule, RuleAction, RuleCategory, RulePatch, UpdateRuleRequest};
use super::RuleError;

/// Validate a create request and apply defaults.
///
/// The trigger is required and must compile as a regular expression.
/// Absent or empty `action`/`category` fall back to `block`/`custom`.
pub fn validate_new_rule(req: CreateRuleRequest) -> Result<NewRule, RuleError> {
    let trigger = req
        .trigger
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RuleError::Validation("Trigger is required".to_string()))?
        .to_string();

    Regex::new(&trigger)
        .map_err(|e| RuleError::Validation(format!("Invalid trigger pattern: {e}")))?;

    Ok(NewRule {
        trigger,
        action: parse_or_default(req.action.as_deref())?,
        category: parse_or_default(req.category.as_deref())?,
        is_active: true,
        description: Some(
            req.description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
        ),
    })
}

/// Validate a partial update.
///
/// Enumerated fields must be known values. A supplied trigger must be
/// non-empty but its pattern syntax is not checked.
pub fn validate_patch(req: UpdateRuleRequest) -> Result<RulePatch, RuleError> {
    let trigger = match req.trigger {
        Some(trigger) => {
            let trimmed = trigger.trim();
            if trimmed.is_empty() {
                return Err(RuleError::Validation("Trigger cannot be empty".to_string()));
            }
            Some(trimmed.to_string())
        }
        None => None,
    };

    Ok(RulePatch {
        trigger,
        action: req.action.as_deref().map(str::parse::<RuleAction>).transpose()?,
        category: req.category.as_deref().map(str::parse::<RuleCategory>).transpose()?,
        is_active: req.is_active,
        description: req.description.map(|d| d.trim().to_string()),
    })
}

fn parse_or_default<T>(raw: Option<&str>) -> Result<T, RuleError>
where
    T: std::str::FromStr<Err = RuleError> + Default,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(T::default()),
        Some(value) => value.parse(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(trigger: Option<&str>) -> CreateRuleRequest {
        CreateRuleRequest {
            trigger: trigger.map(str::to_string),
            ..CreateRuleRequest::default()
        }
    }

    #[test]
    fn test_trigger_required() {
        for trigger in [None, Some(""), Some("   ")] {
            let mut req = create(trigger);
            req.action = Some("hide".to_string());
            req.category = Some("ads".to_string());
            assert!(matches!(
                validate_new_rule(req),
                Err(RuleError::Validation(msg)) if msg == "Trigger is required"
            ));
        }
    }

    #[test]
    fn test_invalid_regex_rejected_with_diagnostic() {
        let err = validate_new_rule(create(Some("[invalid("))).unwrap_err();
        match err {
            RuleError::Validation(msg) => {
                assert!(msg.starts_with("Invalid trigger pattern:"));
                assert!(msg.len() > "Invalid trigger pattern:".len());
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let rule = validate_new_rule(create(Some("  .*example\\.com.*  "))).unwrap();
        assert_eq!(rule.trigger, ".*example\\.com.*");
        assert_eq!(rule.action, RuleAction::Block);
        assert_eq!(rule.category, RuleCategory::Custom);
        assert_eq!(rule.description.as_deref(), Some(""));
        assert!(rule.is_active);
    }

    #[test]
    fn test_empty_enum_strings_use_defaults() {
        let mut req = create(Some("^a$"));
        req.action = Some(String::new());
        req.category = Some(String::new());
        let rule = validate_new_rule(req).unwrap();
        assert_eq!(rule.action, RuleAction::Block);
        assert_eq!(rule.category, RuleCategory::Custom);
    }

    #[test]
    fn test_unknown_enum_rejected() {
        let mut req = create(Some("^a$"));
        req.action = Some("nuke".to_string());
        assert!(matches!(validate_new_rule(req), Err(RuleError::Validation(_))));

        let patch = UpdateRuleRequest {
            category: Some("spam".to_string()),
            ..UpdateRuleRequest::default()
        };
        assert!(matches!(validate_patch(patch), Err(RuleError::Validation(_))));
    }

    #[test]
    fn test_patch_skips_regex_check() {
        let patch = validate_patch(UpdateRuleRequest {
            trigger: Some("[invalid(".to_string()),
            ..UpdateRuleRequest::default()
        })
        .unwrap();
        assert_eq!(patch.trigger.as_deref(), Some("[invalid("));
    }

    #[test]
    fn test_patch_rejects_empty_trigger() {
        let result = validate_patch(UpdateRuleRequest {
            trigger: Some("  ".to_string()),
            ..UpdateRuleRequest::default()
        });
        assert!(matches!(result, Err(RuleError::Validation(_))));
    }

    #[test]
    fn test_patch_description_only() {
        let patch = validate_patch(UpdateRuleRequest {
            description: Some("Updated".to_string()),
            ..UpdateRuleRequest::default()
        })
        .unwrap();
        assert_eq!(
            patch,
            RulePatch {
                description: Some("Updated".to_string()),
                ..RulePatch::default()
            }
        );
    }
}

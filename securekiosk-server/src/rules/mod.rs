//! Ad-block rules: the record model, the default table, request
//! validation and the service the HTTP layer calls.
//!
//! ```text
//! request → validation → RuleService → RuleStore
//! ```

pub mod defaults;
pub mod model;
pub mod service;
pub mod validation;

use thiserror::Error;

use crate::store::StoreError;

pub use defaults::{DefaultRule, DefaultRuleSet, DefaultRulesError};
pub use model::{
    generate_id, AdBlockRule, CreateRuleRequest, NewRule, RuleAction, RuleCategory, RulePatch,
    UpdateRuleRequest,
};
pub use service::RuleService;
pub use validation::{validate_new_rule, validate_patch};

/// Errors surfaced by rule operations.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The request was rejected before reaching the store.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

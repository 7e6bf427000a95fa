//! Ad-block rule endpoints under `/api/adblock`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::error::ApiError;
use super::RulesState;
use crate::rules::{AdBlockRule, CreateRuleRequest, UpdateRuleRequest};

/// `GET /rules`: active rules, or the default table when none exist.
pub async fn list_rules(State(state): State<RulesState>) -> Result<Json<Vec<AdBlockRule>>, ApiError> {
    let rules = state
        .rules
        .list_active()
        .await
        .map_err(|e| ApiError::from_rule_error(e, "Error fetching ad block rules"))?;
    Ok(Json(rules))
}

/// `POST /rules`
pub async fn create_rule(
    State(state): State<RulesState>,
    body: Result<Json<CreateRuleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AdBlockRule>), ApiError> {
    let Json(req) = body?;
    let rule = state
        .rules
        .create(req)
        .await
        .map_err(|e| ApiError::from_rule_error(e, "Error creating ad block rule"))?;
    Ok((StatusCode::CREATED, Json(rule)))
}

/// `PUT /rules/:id`
pub async fn update_rule(
    State(state): State<RulesState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateRuleRequest>, JsonRejection>,
) -> Result<Json<AdBlockRule>, ApiError> {
    let Json(req) = body?;
    let rule = state
        .rules
        .update(&id, req)
        .await
        .map_err(|e| ApiError::from_rule_error(e, "Error updating ad block rule"))?;
    Ok(Json(rule))
}

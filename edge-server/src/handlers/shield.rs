//! Operator handlers for the shield

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use agent_shield_core::api::{self, LocalRules, RuleUpdate};
use agent_shield_core::logic::pattern_sync::SyncReport;
use agent_shield_core::ShieldSettings;

use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRulesRequest {
    #[validate(length(max = 500))]
    pub custom_blocks: Option<Vec<String>>,
    #[validate(length(max = 500))]
    pub custom_allows: Option<Vec<String>>,
    pub block_ai_model_trainers: Option<bool>,
}

impl From<UpdateRulesRequest> for RuleUpdate {
    fn from(req: UpdateRulesRequest) -> Self {
        RuleUpdate {
            custom_blocks: req.custom_blocks,
            custom_allows: req.custom_allows,
            block_ai_model_trainers: req.block_ai_model_trainers,
        }
    }
}

/// POST /api/v1/shield/sync
pub async fn sync(State(state): State<AppState>) -> AppResult<Json<SyncReport>> {
    if !ShieldSettings::read(state.shield.config().as_ref()).has_api_key() {
        return Err(AppError::ValidationError(
            "API key is required for syncing patterns.".to_string(),
        ));
    }

    let shield = state.shield.clone();
    let report = tokio::task::spawn_blocking(move || api::sync_patterns(&shield))
        .await?
        .map_err(AppError::SyncFailed)?;

    tracing::info!(
        "Synced {} agent patterns, version {}",
        report.agents,
        report.version
    );
    Ok(Json(report))
}

/// GET /api/v1/shield/patterns/stats
pub async fn pattern_stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "patterns": api::get_pattern_statistics(&state.shield),
        "sync": api::get_sync_status(&state.shield),
        "telemetry": api::get_telemetry_stats(&state.shield),
    }))
}

/// GET /api/v1/shield/settings
pub async fn settings(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "central": api::get_central_settings(&state.shield),
        "local": api::get_local_rules(&state.shield),
    }))
}

/// PUT /api/v1/shield/rules
pub async fn update_rules(
    State(state): State<AppState>,
    Json(req): Json<UpdateRulesRequest>,
) -> AppResult<Json<LocalRules>> {
    req.validate()?;

    let rules = api::update_custom_rules(&state.shield, req.into())
        .map_err(AppError::ValidationError)?;
    Ok(Json(rules))
}

/// DELETE /api/v1/shield/cache
pub async fn clear_cache(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let shield = state.shield.clone();
    tokio::task::spawn_blocking(move || api::clear_pattern_cache(&shield))
        .await?
        .map_err(AppError::InternalError)?;

    Ok(Json(json!({ "message": "Pattern cache cleared" })))
}

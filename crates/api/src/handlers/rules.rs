//! Handlers for reading and patching suppression rules.

use axum::extract::State;
use axum::Json;
use triage_core::rules::{RulePatch, RuleSet};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /rules
pub async fn get_rules(State(state): State<AppState>) -> Json<DataResponse<RuleSet>> {
    let rules = state.engine.rules().current();
    Json(DataResponse {
        data: RuleSet::clone(&rules),
    })
}

/// PUT /rules
///
/// Merge the fields present in the body into the current rules. A body that
/// does not parse as a patch (unknown or mistyped fields) is a 400
/// `BAD_REQUEST`; a patch with unknown event types or out-of-range values is
/// a 400 `VALIDATION_ERROR`. Either way the rules are left unchanged.
pub async fn update_rules(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Json<DataResponse<RuleSet>>> {
    let patch: RulePatch = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid rule patch: {e}")))?;

    let rules = state.engine.rules().patch(&patch)?;

    Ok(Json(DataResponse {
        data: RuleSet::clone(&rules),
    }))
}

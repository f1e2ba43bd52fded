use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use triage_pipeline::UserHistory;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

/// GET /users/{user_id}/history
///
/// Recent decisions (newest first) plus remaining hourly and daily quota.
pub async fn get_user_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<DataResponse<UserHistory>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let history = state
        .engine
        .user_history(&user_id, limit, Utc::now())
        .await?;

    Ok(Json(DataResponse { data: history }))
}

//! Handlers for the decision audit trail.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use triage_core::decision::Decision;
use triage_db::{AuditPage, AuditQuery};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for audit log queries.
#[derive(Debug, Deserialize)]
pub struct AuditLogQueryParams {
    pub user_id: Option<String>,
    pub decision: Option<String>,
    pub limit: Option<usize>,
}

/// GET /audit/logs
///
/// Matching decision records, newest first. `limit` defaults to 50 and is
/// capped at 200.
pub async fn query_audit_logs(
    State(state): State<AppState>,
    Query(params): Query<AuditLogQueryParams>,
) -> AppResult<Json<DataResponse<AuditPage>>> {
    let decision = params
        .decision
        .as_deref()
        .map(str::parse::<Decision>)
        .transpose()?;

    let query = AuditQuery {
        user_id: params.user_id.filter(|u| !u.is_empty()),
        decision,
        limit: params.limit,
    };
    let page = state.engine.stores().audit.query(&query).await?;

    Ok(Json(DataResponse { data: page }))
}

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Live and expired-but-unswept dedup keys.
    pub dedup_entries: usize,
    /// Users with a decision timeline.
    pub tracked_users: usize,
    /// Records held by the audit log.
    pub audit_records: usize,
}

/// GET /health -- returns service status and store sizes.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stores = state.engine.stores();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        dedup_entries: stores.dedup.len(),
        tracked_users: stores.history.user_count(),
        audit_records: stores.audit.len(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

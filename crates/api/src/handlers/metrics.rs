use axum::extract::State;
use axum::Json;
use serde::Serialize;
use triage_pipeline::MetricsSnapshot;

use crate::response::DataResponse;
use crate::state::AppState;

/// Decision counters plus current store sizes.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub decisions: MetricsSnapshot,
    pub dedup_entries: usize,
    pub tracked_users: usize,
    pub audit_records: usize,
}

/// GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Json<DataResponse<MetricsResponse>> {
    let engine = &state.engine;
    let stores = engine.stores();

    Json(DataResponse {
        data: MetricsResponse {
            decisions: engine.metrics().snapshot(),
            dedup_entries: stores.dedup.len(),
            tracked_users: stores.history.user_count(),
            audit_records: stores.audit.len(),
        },
    })
}

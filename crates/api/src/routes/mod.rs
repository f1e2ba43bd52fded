pub mod audit;
pub mod health;
pub mod notify;
pub mod rules;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /notify/classify                 classify one event (POST)
/// /notify/batch                    classify up to BATCH_LIMIT events (POST)
///
/// /audit/logs                      query decision audit trail (GET)
///
/// /rules                           current rules (GET), partial update (PUT)
///
/// /users/{user_id}/history         recent decisions and remaining quota (GET)
///
/// /metrics                         decision counters and rates (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/notify", notify::router())
        .nest("/audit", audit::router())
        .nest("/rules", rules::router())
        .nest("/users", users::router())
        .route("/metrics", get(handlers::metrics::get_metrics))
}

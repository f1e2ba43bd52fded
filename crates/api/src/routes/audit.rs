//! Route definitions for the decision audit trail.

use axum::routing::get;
use axum::Router;

use crate::handlers::audit;
use crate::state::AppState;

/// Audit routes mounted at `/audit`.
///
/// ```text
/// GET  /logs    -> query_audit_logs
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/logs", get(audit::query_audit_logs))
}

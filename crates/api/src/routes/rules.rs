use axum::routing::get;
use axum::Router;

use crate::handlers::rules;
use crate::state::AppState;

/// Rule routes mounted at `/rules`.
///
/// ```text
/// GET  /    -> get_rules
/// PUT  /    -> update_rules
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(rules::get_rules).put(rules::update_rules))
}

use axum::routing::get;
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Per-user routes mounted at `/users`.
///
/// ```text
/// GET  /{user_id}/history    -> get_user_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/{user_id}/history", get(users::get_user_history))
}

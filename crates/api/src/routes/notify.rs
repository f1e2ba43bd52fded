//! Route definitions for notification classification.

use axum::routing::post;
use axum::Router;

use crate::handlers::notify;
use crate::state::AppState;

/// Classification routes mounted at `/notify`.
///
/// ```text
/// POST /classify    -> classify
/// POST /batch       -> classify_batch
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/classify", post(notify::classify))
        .route("/batch", post(notify::classify_batch))
}

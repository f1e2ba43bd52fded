use std::sync::Arc;

use triage_pipeline::DecisionEngine;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The decision pipeline, with its rules, stores and decision bus.
    pub engine: Arc<DecisionEngine>,
}

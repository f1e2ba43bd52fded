#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use triage_api::config::ServerConfig;
use triage_api::router::build_app_router;
use triage_api::state::AppState;
use triage_db::Stores;
use triage_pipeline::{DecisionEngine, EngineConfig};

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        audit_capacity: 1_000,
        sweep_interval_secs: 60,
        engine: EngineConfig::default(),
    }
}

/// Build the full application router around a fresh in-memory engine.
pub fn build_test_app() -> Router {
    build_test_app_with(test_config())
}

/// Build the full application router with a custom configuration.
pub fn build_test_app_with(config: ServerConfig) -> Router {
    let engine = DecisionEngine::new(config.engine.clone(), Stores::in_memory(config.audit_capacity));
    let state = AppState {
        engine: Arc::new(engine),
    };
    build_app_router(state, &config)
}

/// Send a GET request through a clone of `app`.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a JSON POST request through a clone of `app`.
pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send_json(app, Method::POST, uri, body).await
}

/// Send a JSON PUT request through a clone of `app`.
pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send_json(app, Method::PUT, uri, body).await
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

//! Integration tests for `/api/v1/audit/logs`.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{body_json, get, post_json};
use serde_json::json;

async fn classify(app: &Router, user: &str, message: &str) {
    let response = post_json(
        app,
        "/api/v1/notify/classify",
        json!({ "user_id": user, "event_type": "alert", "message": message }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: every decision is audited, newest first
// ---------------------------------------------------------------------------

#[tokio::test]
async fn audit_lists_every_decision_newest_first() {
    let app = common::build_test_app();
    classify(&app, "u1", "first").await;
    classify(&app, "u2", "second").await;
    classify(&app, "u1", "first").await;

    let json = body_json(get(&app, "/api/v1/audit/logs").await).await;
    let data = &json["data"];

    assert_eq!(data["total"], 3);
    let items = data["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["decision"], "never");
    assert_eq!(items[2]["user_id"], "u1");
    assert_eq!(items[2]["decision"], "now");
}

// ---------------------------------------------------------------------------
// Test: filters and limit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn audit_filters_by_user_and_decision() {
    let app = common::build_test_app();
    classify(&app, "u1", "first").await;
    classify(&app, "u2", "second").await;
    classify(&app, "u1", "first").await;

    let by_user = body_json(get(&app, "/api/v1/audit/logs?user_id=u2").await).await;
    assert_eq!(by_user["data"]["total"], 1);
    assert_eq!(by_user["data"]["items"][0]["user_id"], "u2");

    let never = body_json(get(&app, "/api/v1/audit/logs?user_id=u1&decision=never").await).await;
    assert_eq!(never["data"]["total"], 1);

    let limited = body_json(get(&app, "/api/v1/audit/logs?limit=1").await).await;
    assert_eq!(limited["data"]["total"], 3);
    assert_eq!(limited["data"]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_decision_filter_returns_400() {
    let app = common::build_test_app();

    let response = get(&app, "/api/v1/audit/logs?decision=sometimes").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

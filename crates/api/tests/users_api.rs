//! Integration tests for `/api/v1/users/{user_id}/history` and `/api/v1/metrics`.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use serde_json::json;

// ---------------------------------------------------------------------------
// Test: history shows recent decisions and remaining quota
// ---------------------------------------------------------------------------

#[tokio::test]
async fn history_reports_recent_entries_and_quota() {
    let app = common::build_test_app();
    for message in ["Disk full", "CPU hot", "CPU hot"] {
        post_json(
            &app,
            "/api/v1/notify/classify",
            json!({ "user_id": "u1", "event_type": "alert", "message": message }),
        )
        .await;
    }

    let response = get(&app, "/api/v1/users/u1/history").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["user_id"], "u1");
    assert_eq!(data["recent"].as_array().unwrap().len(), 3);
    assert_eq!(data["recent"][0]["decision"], "never");
    assert_eq!(data["hourly"]["used"], 2);
    assert_eq!(data["hourly"]["limit"], 10);
    assert_eq!(data["hourly"]["remaining"], 8);
    assert_eq!(data["daily"]["remaining"], 28);
}

#[tokio::test]
async fn history_for_unknown_user_is_empty() {
    let app = common::build_test_app();

    let json = body_json(get(&app, "/api/v1/users/nobody/history?limit=5").await).await;

    assert!(json["data"]["recent"].as_array().unwrap().is_empty());
    assert_eq!(json["data"]["hourly"]["remaining"], 10);
}

// ---------------------------------------------------------------------------
// Test: metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_count_decisions_and_store_sizes() {
    let app = common::build_test_app();
    for message in ["Disk full", "Disk full"] {
        post_json(
            &app,
            "/api/v1/notify/classify",
            json!({ "user_id": "u1", "event_type": "alert", "message": message }),
        )
        .await;
    }

    let response = get(&app, "/api/v1/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["total_processed"], 2);
    assert_eq!(data["decisions"]["now"], 1);
    assert_eq!(data["decisions"]["never"], 1);
    assert_eq!(data["rates"]["send_rate"], 50.0);
    assert_eq!(data["duplicates_suppressed"], 1);
    assert_eq!(data["fallbacks"], 0);
    assert_eq!(data["tracked_users"], 1);
    assert_eq!(data["audit_records"], 2);
}

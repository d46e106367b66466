//! Index, health and fallback responses.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running (cargo run -p quick-laundry-server)

use quick_laundry_integration_tests::{client, expect_error, expect_json, url};
use reqwest::StatusCode;

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_index_lists_endpoints() {
    let resp = client().get(url("/")).send().await.expect("request failed");
    let body = expect_json(resp, StatusCode::OK).await;

    assert!(body["message"].as_str().unwrap_or_default().starts_with("Welcome to"));
    assert_eq!(body["endpoints"]["pricing"], "/api/pricing");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_health_reports_database() {
    let resp = client().get(url("/health")).send().await.expect("request failed");
    let body = expect_json(resp, StatusCode::OK).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_liveness() {
    let resp = client().get(url("/health/live")).send().await.expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_unknown_route_is_json_404() {
    let resp = client()
        .get(url("/api/does-not-exist"))
        .send()
        .await
        .expect("request failed");
    expect_error(resp, StatusCode::NOT_FOUND, "Endpoint not found").await;
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_wrong_method_is_json_405() {
    let resp = client()
        .delete(url("/api/pricing/categories"))
        .send()
        .await
        .expect("request failed");
    expect_error(resp, StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").await;
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_trailing_slash_is_ignored() {
    let resp = client()
        .get(url("/api/orders/health/"))
        .send()
        .await
        .expect("request failed");
    let body = expect_json(resp, StatusCode::OK).await;
    assert_eq!(body["service"], "orders");
}

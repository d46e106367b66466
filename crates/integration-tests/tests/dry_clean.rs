//! Dry-clean pickup lifecycle and contact form.

use quick_laundry_integration_tests::{client, expect_error, expect_json, unique_email, url};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_pickup_lifecycle() {
    let client = client();
    let email = unique_email("pickup");

    let resp = client
        .post(url("/api/dry-clean/orders"))
        .json(&json!({
            "name": "Integration Test",
            "email": email,
            "phone": "9876543210",
            "address": "4 Park Street",
            "service": "Dry Clean",
            "items": [{"type": "suit", "qty": 1}],
            "pickupDate": "2030-01-15",
            "pickupTime": "10:00-12:00",
        }))
        .send()
        .await
        .expect("create failed");
    let body = expect_json(resp, StatusCode::CREATED).await;
    assert_eq!(body["message"], "Order placed successfully!");
    let id = body["order"]["id"].as_i64().expect("order id");

    let resp = client
        .put(url(&format!("/api/dry-clean/orders/{id}/status")))
        .json(&json!({"status": "confirmed"}))
        .send()
        .await
        .expect("status update failed");
    let body = expect_json(resp, StatusCode::OK).await;
    assert_eq!(body["order"]["status"], "confirmed");

    let resp = client
        .get(url(&format!("/api/dry-clean/orders?email={email}")))
        .send()
        .await
        .expect("list failed");
    let body = expect_json(resp, StatusCode::OK).await;
    assert_eq!(body["count"], 1);

    let resp = client
        .delete(url(&format!("/api/dry-clean/orders/{id}")))
        .send()
        .await
        .expect("delete failed");
    expect_json(resp, StatusCode::OK).await;

    let resp = client
        .get(url(&format!("/api/dry-clean/orders/{id}")))
        .send()
        .await
        .expect("get failed");
    expect_error(resp, StatusCode::NOT_FOUND, "Order not found").await;
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_pickup_validation() {
    let resp = client()
        .post(url("/api/dry-clean/orders"))
        .json(&json!({"name": "Someone", "email": unique_email("partial")}))
        .send()
        .await
        .expect("request failed");
    expect_error(
        resp,
        StatusCode::BAD_REQUEST,
        "Missing required fields: phone, address, service, items, pickupDate, pickupTime",
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_invalid_status() {
    let resp = client()
        .put(url("/api/dry-clean/orders/1/status"))
        .json(&json!({"status": "lost"}))
        .send()
        .await
        .expect("request failed");
    expect_error(
        resp,
        StatusCode::BAD_REQUEST,
        "Invalid status. Must be one of: pending, confirmed, processing, completed, cancelled",
    )
    .await;
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_contact_form() {
    let resp = client()
        .post(url("/api/dry-clean/contact"))
        .json(&json!({
            "name": "Integration Test",
            "email": unique_email("contact"),
            "subject": "Stain removal",
            "message": "Can you remove wine stains from silk?",
        }))
        .send()
        .await
        .expect("request failed");
    let body = expect_json(resp, StatusCode::CREATED).await;
    assert!(body["contact_id"].is_number());
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_statistics_and_health() {
    let resp = client()
        .get(url("/api/dry-clean/statistics"))
        .send()
        .await
        .expect("request failed");
    let body = expect_json(resp, StatusCode::OK).await;
    assert!(body["statistics"]["total_orders"].is_number());

    let resp = client()
        .get(url("/api/dry-clean/health"))
        .send()
        .await
        .expect("request failed");
    let body = expect_json(resp, StatusCode::OK).await;
    assert_eq!(body["status"], "healthy");
}

//! HTTP tests for the mechanic-only inventory routes

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::{Value, json};

#[tokio::test]
async fn test_inventory_crud() {
    let server = server();
    let (_, token) = mechanic(&server, "m1@shop.com").await;

    let response = server
        .post("/api/inventory")
        .authorization_bearer(&token)
        .json(&json!({ "name": "Oil filter", "sku": "OF-100", "description": "Spin-on", "price": 7.25 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: Value = response.json();
    let id = created["id"].as_str().unwrap();
    assert_eq!(created["price"], 7.25);

    let response = server
        .put(&format!("/api/inventory/{id}"))
        .authorization_bearer(&token)
        .json(&json!({ "price": 8.0 }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["price"], 8.0);
    assert_eq!(updated["sku"], "OF-100");

    server
        .delete(&format!("/api/inventory/{id}"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .get(&format!("/api/inventory/{id}"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inventory_is_mechanic_only() {
    let server = server();
    let (_, customer_token) = customer(&server, "a@b.com").await;

    server
        .get("/api/inventory")
        .authorization_bearer(&customer_token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .post("/api/inventory")
        .authorization_bearer(&customer_token)
        .json(&json!({ "name": "Oil filter", "sku": "OF-100", "price": 7.25 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_duplicate_sku_conflicts() {
    let server = server();
    let (_, token) = mechanic(&server, "m1@shop.com").await;
    part(&server, &token, "PAD-1").await;

    server
        .post("/api/inventory")
        .authorization_bearer(&token)
        .json(&json!({ "name": "Other", "sku": "PAD-1", "price": 1.0 }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_negative_price_is_rejected() {
    let server = server();
    let (_, token) = mechanic(&server, "m1@shop.com").await;

    server
        .post("/api/inventory")
        .authorization_bearer(&token)
        .json(&json!({ "name": "Pad", "sku": "PAD-1", "price": -0.5 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_part_detaches_from_tickets() {
    let server = server();
    let (customer_id, _) = customer(&server, "a@b.com").await;
    let (_, token) = mechanic(&server, "m1@shop.com").await;
    let pad = part(&server, &token, "PAD-1").await;
    let created = ticket(&server, &token, customer_id, &[]).await;
    let ticket_id = created["id"].as_str().unwrap();

    server
        .post(&format!("/api/service-tickets/{ticket_id}/add-parts"))
        .authorization_bearer(&token)
        .json(&json!({ "part_ids": [pad] }))
        .await
        .assert_status_ok();
    server
        .delete(&format!("/api/inventory/{pad}"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = server
        .get(&format!("/api/service-tickets/{ticket_id}/parts"))
        .authorization_bearer(&token)
        .await;
    let parts: Value = response.json();
    assert_eq!(parts, json!([]));
}

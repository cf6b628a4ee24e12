//! Shared helpers for the HTTP-level tests
#![allow(dead_code)]

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{Value, json};
use uuid::Uuid;
use workshop::config::WorkshopConfig;
use workshop::server::ServerBuilder;

pub const PASSWORD: &str = "pw1";

/// A fresh server with its own store; cache and rate limits are off
pub fn server() -> TestServer {
    server_with(WorkshopConfig::for_tests())
}

pub fn server_with(config: WorkshopConfig) -> TestServer {
    let app = ServerBuilder::from_config(config).build().unwrap();
    TestServer::try_new(app).unwrap()
}

pub fn customer_payload(email: &str) -> Value {
    json!({
        "name": "Alice Doe",
        "email": email,
        "phone": "555-0100",
        "address": "1 Main St",
        "password": PASSWORD
    })
}

pub fn mechanic_payload(email: &str) -> Value {
    json!({
        "name": "Bob Wrench",
        "email": email,
        "phone": "555-0200",
        "address": "2 Garage Rd",
        "specialty": "Brakes",
        "salary": 52000.0,
        "password": PASSWORD
    })
}

pub fn id_of(body: &Value) -> Uuid {
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

pub async fn login(server: &TestServer, resource: &str, email: &str, password: &str) -> String {
    let response = server
        .post(&format!("/api/{resource}/login"))
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

/// Register a customer and log in
pub async fn customer(server: &TestServer, email: &str) -> (Uuid, String) {
    let response = server
        .post("/api/customers")
        .json(&customer_payload(email))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = id_of(&response.json());
    (id, login(server, "customers", email, PASSWORD).await)
}

/// Register a mechanic and log in
pub async fn mechanic(server: &TestServer, email: &str) -> (Uuid, String) {
    let response = server
        .post("/api/mechanics")
        .json(&mechanic_payload(email))
        .await;
    response.assert_status(StatusCode::CREATED);
    let id = id_of(&response.json());
    (id, login(server, "mechanics", email, PASSWORD).await)
}

pub async fn part(server: &TestServer, token: &str, sku: &str) -> Uuid {
    let response = server
        .post("/api/inventory")
        .authorization_bearer(token)
        .json(&json!({ "name": "Brake pad", "sku": sku, "price": 19.5 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    id_of(&response.json())
}

pub async fn ticket(
    server: &TestServer,
    token: &str,
    customer_id: Uuid,
    mechanic_ids: &[Uuid],
) -> Value {
    let response = server
        .post("/api/service-tickets")
        .authorization_bearer(token)
        .json(&json!({
            "description": "Brake noise",
            "customer_id": customer_id,
            "mechanic_ids": mechanic_ids
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

//! Domain connection integration tests for audit-service.
//!
//! These tests require a running PostgreSQL (see TEST_DATABASE_URL)
//! and are ignored by default.

mod common;

use common::{test_owner_id, TestApp};
use serde_json::{json, Value};

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn create_connection_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/connections", app.address))
        .json(&json!({
            "owner_id": test_owner_id(),
            "domain": "example.com",
            "admin_email": "admin@example.com",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["domain"], "example.com");
    assert_eq!(body["admin_email"], "admin@example.com");
    assert_eq!(body["is_active"], true);
    assert!(!body["connection_id"].as_str().unwrap().is_empty());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn duplicate_create_updates_admin_and_keeps_one_row() {
    let app = TestApp::spawn().await;

    let first: Value = app
        .client
        .post(format!("{}/connections", app.address))
        .json(&json!({
            "owner_id": test_owner_id(),
            "domain": "example.com",
            "admin_email": "a@example.com",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let second: Value = app
        .client
        .post(format!("{}/connections", app.address))
        .json(&json!({
            "owner_id": test_owner_id(),
            "domain": "example.com",
            "admin_email": "b@example.com",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Same record, refreshed admin identity.
    assert_eq!(first["connection_id"], second["connection_id"]);
    assert_eq!(second["admin_email"], "b@example.com");
    assert_eq!(second["is_active"], true);

    let list: Vec<Value> = app
        .client
        .get(format!(
            "{}/connections?owner_id={}",
            app.address,
            test_owner_id()
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["admin_email"], "b@example.com");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn blank_domain_is_rejected_before_any_external_call() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/connections", app.address))
        .json(&json!({
            "owner_id": test_owner_id(),
            "domain": "",
            "admin_email": "admin@example.com",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn invalid_admin_email_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .post(format!("{}/connections", app.address))
        .json(&json!({
            "owner_id": test_owner_id(),
            "domain": "example.com",
            "admin_email": "not-an-email",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn deactivate_is_idempotent_and_unknown_id_is_404() {
    let app = TestApp::spawn().await;

    let created: Value = app
        .client
        .post(format!("{}/connections", app.address))
        .json(&json!({
            "owner_id": test_owner_id(),
            "domain": "example.com",
            "admin_email": "admin@example.com",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let connection_id = created["connection_id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let response = app
            .client
            .post(format!(
                "{}/connections/{}/deactivate",
                app.address, connection_id
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["is_active"], false);
    }

    let response = app
        .client
        .post(format!(
            "{}/connections/{}/deactivate",
            app.address,
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_connection_reports_failure_in_band_without_mutating() {
    let app = TestApp::spawn().await;

    // No signing key configured: the smoke test must answer 200 with
    // success=false rather than erroring.
    let response = app
        .client
        .post(format!("{}/connections/test", app.address))
        .json(&json!({
            "domain": "example.com",
            "admin_email": "admin@example.com",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    let list: Vec<Value> = app
        .client
        .get(format!(
            "{}/connections?owner_id={}",
            app.address,
            test_owner_id()
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.is_empty());

    app.cleanup().await;
}

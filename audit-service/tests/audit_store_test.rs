//! Audit store integration tests for audit-service.
//!
//! These tests require a running PostgreSQL (see TEST_DATABASE_URL)
//! and are ignored by default.

mod common;

use audit_service::models::{
    FilePermission, GranteeType, NewAuditRun, SharedFileRecord, UserAuditResult,
};
use audit_service::services::AuditStore;
use common::TestApp;
use uuid::Uuid;

fn sample_run(domain: &str, total_users: i32) -> NewAuditRun {
    let files = vec![SharedFileRecord {
        file_id: "f1".to_string(),
        name: "Roadmap".to_string(),
        view_link: Some("https://drive.example.com/f1".to_string()),
        modified_utc: None,
        owner_email: "a@example.com".to_string(),
        permissions: vec![FilePermission {
            grantee: GranteeType::Anyone,
            role: "reader".to_string(),
            domain: None,
        }],
    }];

    NewAuditRun {
        domain: domain.to_string(),
        total_users,
        total_files: files.len() as i32,
        results: vec![UserAuditResult {
            email: "a@example.com".to_string(),
            display_name: "Alice A".to_string(),
            file_count: files.len() as i32,
            files,
        }],
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn save_and_get_audit_run_round_trips() {
    let app = TestApp::spawn().await;

    let saved = app
        .db
        .save_audit_run(sample_run("example.com", 3))
        .await
        .expect("save should succeed");

    assert_eq!(saved.domain, "example.com");
    assert_eq!(saved.total_users, 3);
    assert_eq!(saved.total_files, 1);

    let fetched = app
        .db
        .get_audit_run(saved.run_id)
        .await
        .unwrap()
        .expect("run should exist");

    assert_eq!(fetched.run_id, saved.run_id);
    assert_eq!(fetched.results.len(), 1);
    assert_eq!(fetched.results[0].email, "a@example.com");
    assert_eq!(fetched.results[0].files[0].file_id, "f1");
    assert_eq!(
        fetched.results[0].files[0].permissions[0].grantee,
        GranteeType::Anyone
    );

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn get_unknown_run_is_none() {
    let app = TestApp::spawn().await;

    let missing = app.db.get_audit_run(Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn history_is_newest_first_capped_and_filterable() {
    let app = TestApp::spawn().await;

    // 52 runs for one domain, 1 for another.
    for i in 0..52 {
        app.db
            .save_audit_run(sample_run("example.com", i))
            .await
            .unwrap();
    }
    app.db
        .save_audit_run(sample_run("other.com", 7))
        .await
        .unwrap();

    let unfiltered = app.db.list_audit_history(None).await.unwrap();
    assert_eq!(unfiltered.len(), 50);
    for window in unfiltered.windows(2) {
        assert!(window[0].created_utc >= window[1].created_utc);
    }

    let filtered = app
        .db
        .list_audit_history(Some("other.com"))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].domain, "other.com");
    assert_eq!(filtered[0].total_users, 7);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn audit_history_endpoint_serves_saved_runs() {
    let app = TestApp::spawn().await;

    let saved = app
        .db
        .save_audit_run(sample_run("example.com", 2))
        .await
        .unwrap();

    let list: Vec<serde_json::Value> = app
        .client
        .get(format!("{}/audits?domain=example.com", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["run_id"], saved.run_id.to_string());

    let one = app
        .client
        .get(format!("{}/audits/{}", app.address, saved.run_id))
        .send()
        .await
        .unwrap();
    assert_eq!(one.status().as_u16(), 200);

    let missing = app
        .client
        .get(format!("{}/audits/{}", app.address, Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    app.cleanup().await;
}

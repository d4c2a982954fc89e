use axum::http::StatusCode;
use serde_json::json;

use licensor::models::LicenseFilter;
use licensor::store::LicenseStore;

use crate::common::*;

fn license_body() -> serde_json::Value {
    json!({
        "license": "PRO-ABCD-EFGH-JKLM-NPQR",
        "domain": "example.com",
        "email": "a@b.com",
        "amount": 0
    })
}

#[tokio::test]
async fn test_create_license_then_lookup() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (status, body) = post_json(app.router(), "/license", license_body()).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "License created successfully");
    let id = body["id"].as_str().unwrap();

    let found = app
        .store
        .as_ref()
        .unwrap()
        .find_one(&LicenseFilter::by_key_and_domain(
            "PRO-ABCD-EFGH-JKLM-NPQR",
            "example.com",
        ))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.record.email, "a@b.com");
    assert_eq!(found.record.amount, 0.0);
    assert_eq!(found.record.transaction_id, None);
    assert!(!found.record.created_at.is_empty());
}

#[tokio::test]
async fn test_create_license_is_not_idempotent() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (first, a) = post_json(app.router(), "/license", license_body()).await;
    let (second, b) = post_json(app.router(), "/license", license_body()).await;

    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(second, StatusCode::CREATED);
    assert_ne!(a["id"], b["id"]);
    assert_eq!(app.license_documents().len(), 2);
}

#[tokio::test]
async fn test_create_license_missing_fields() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (status, body) = post_json(
        app.router(),
        "/license",
        json!({ "license": "PRO-ABCD-EFGH-JKLM-NPQR", "domain": "example.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: email, amount");
    assert!(app.license_documents().is_empty());
}

#[tokio::test]
async fn test_create_license_rejects_negative_amount() {
    let app = TestApp::new(StubGateway::completed("TXN1"));
    let mut body = license_body();
    body["amount"] = json!(-5);

    let (status, _) = post_json(app.router(), "/license", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.license_documents().is_empty());
}

#[tokio::test]
async fn test_create_license_rejects_non_numeric_amount() {
    let app = TestApp::new(StubGateway::completed("TXN1"));
    let mut body = license_body();
    body["amount"] = json!("49");

    let (status, _) = post_json(app.router(), "/license", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_license_without_store_is_unavailable() {
    let app = TestApp::new(StubGateway::completed("TXN1")).with_store(None);

    let (status, _) = post_json(app.router(), "/license", license_body()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_create_license_store_error_is_generic() {
    let app = TestApp::new(StubGateway::completed("TXN1"))
        .with_store(Some(std::sync::Arc::new(FailingStore)));

    let (status, body) = post_json(app.router(), "/license", license_body()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert!(!body.to_string().contains("disk full"));
}

#[tokio::test]
async fn test_admin_key_guards_license_creation() {
    let app = TestApp::new(StubGateway::completed("TXN1"))
        .configure(|c| c.admin_api_key = Some("admin-secret".into()));

    let (status, _) = post_json(app.router(), "/license", license_body()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post_json_with_headers(
        app.router(),
        "/license",
        license_body(),
        &[("authorization", "Bearer wrong")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.license_documents().is_empty());

    let (status, _) = post_json_with_headers(
        app.router(),
        "/license",
        license_body(),
        &[("authorization", "Bearer admin-secret")],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_admin_key_does_not_guard_public_routes() {
    let app = TestApp::new(StubGateway::completed("TXN1"))
        .configure(|c| c.admin_api_key = Some("admin-secret".into()));

    let (status, _) = get(app.router(), "/config").await;
    assert_eq!(status, StatusCode::OK);
}

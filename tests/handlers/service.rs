//! Status, client config, contact form, rate limiting and CORS

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;

use licensor::config::RateLimit;

use crate::common::*;

const VERIFY_URI: &str = "/verify?key=PRO-ABCD-EFGH-JKLM-NPQR&domain=example.com";

fn contact_body() -> serde_json::Value {
    json!({
        "name": "Eve",
        "email": "eve@example.com",
        "subject": "Refund",
        "message": "Hello\nthere"
    })
}

#[tokio::test]
async fn test_status_with_store() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (status, body) = get(app.router(), "/status").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_status_without_store() {
    let app = TestApp::new(StubGateway::completed("TXN1")).with_store(None);

    let (status, body) = get(app.router(), "/status").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_status_with_unreachable_store() {
    let app = TestApp::new(StubGateway::completed("TXN1")).with_store(Some(Arc::new(FailingStore)));

    let (status, _) = get(app.router(), "/status").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_config_returns_client_id() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (status, body) = get(app.router(), "/config").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "paypalClientId": TEST_CLIENT_ID }));
}

#[tokio::test]
async fn test_config_without_client_id_is_generic_error() {
    let app = TestApp::new(StubGateway::completed("TXN1")).configure(|c| c.paypal.client_id = None);

    let (status, body) = get(app.router(), "/config").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
    assert!(!body.to_string().contains("PAYPAL_CLIENT_ID"));
}

#[tokio::test]
async fn test_contact_form_forwards_to_admin() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (status, body) = post_json(app.router(), "/send-email", contact_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email sent successfully");

    let sent = app.sent_emails();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ADMIN_EMAIL);
    assert_eq!(sent[0].subject, "[Contact] Refund");
    assert_eq!(sent[0].reply_to.as_deref(), Some("eve@example.com"));
    assert!(sent[0].html.contains("Hello<br>there"));
}

#[tokio::test]
async fn test_contact_form_missing_fields() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (status, body) = post_json(
        app.router(),
        "/send-email",
        json!({ "name": "Eve", "email": "eve@example.com" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: subject, message");
    assert!(app.sent_emails().is_empty());
}

#[tokio::test]
async fn test_contact_form_without_email_service() {
    let app = TestApp::new(StubGateway::completed("TXN1")).with_notifier(None);

    let (status, _) = post_json(app.router(), "/send-email", contact_body()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_contact_form_without_admin_address() {
    let app = TestApp::new(StubGateway::completed("TXN1"))
        .configure(|c| c.email.admin_email = None);

    let (status, _) = post_json(app.router(), "/send-email", contact_body()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(app.sent_emails().is_empty());
}

#[tokio::test]
async fn test_contact_form_send_failure() {
    let app = TestApp::new(StubGateway::completed("TXN1"))
        .with_notifier(Some(RecordingNotifier::failing()));

    let (status, body) = post_json(app.router(), "/send-email", contact_body()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to send email");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new(StubGateway::completed("TXN1"));

    let (status, _) = get(app.router(), "/licenses").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============ Rate limiting ============

fn rate_limited_app(per_second: u64, burst: u32) -> TestApp {
    TestApp::new(StubGateway::completed("TXN1"))
        .configure(|c| c.rate_limit = Some(RateLimit { per_second, burst }))
}

#[tokio::test]
async fn test_rate_limit_rejects_after_burst_and_refills() {
    let router = rate_limited_app(10, 1).router();
    let client = [("x-forwarded-for", "203.0.113.9")];

    let (first, _) = get_with_headers(router.clone(), VERIFY_URI, &client).await;
    assert_eq!(first, StatusCode::NOT_FOUND);

    let (second, _) = get_with_headers(router.clone(), VERIFY_URI, &client).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);

    // 10 per second refills one slot every 100ms
    tokio::time::sleep(Duration::from_millis(250)).await;
    let (third, _) = get_with_headers(router.clone(), VERIFY_URI, &client).await;
    assert_eq!(third, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_is_per_client_ip() {
    let router = rate_limited_app(1, 1).router();

    let (first, _) =
        get_with_headers(router.clone(), VERIFY_URI, &[("x-forwarded-for", "203.0.113.9")]).await;
    let (limited, _) =
        get_with_headers(router.clone(), VERIFY_URI, &[("x-forwarded-for", "203.0.113.9")]).await;
    let (other, _) =
        get_with_headers(router.clone(), VERIFY_URI, &[("x-forwarded-for", "198.51.100.4")]).await;

    assert_eq!(first, StatusCode::NOT_FOUND);
    assert_eq!(limited, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(other, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_covers_write_routes() {
    let router = rate_limited_app(1, 1).router();
    let client = [("x-forwarded-for", "203.0.113.9")];

    let (first, _) =
        post_json_with_headers(router.clone(), "/create-order", json!({}), &client).await;
    let (second, _) =
        post_json_with_headers(router.clone(), "/create-order", json!({}), &client).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_status_and_config_are_not_rate_limited() {
    let router = rate_limited_app(1, 1).router();
    let client = [("x-forwarded-for", "203.0.113.9")];

    for _ in 0..5 {
        let (status, _) = get_with_headers(router.clone(), "/status", &client).await;
        assert_eq!(status, StatusCode::OK);

        let (config, _) = get_with_headers(router.clone(), "/config", &client).await;
        assert_eq!(config, StatusCode::OK);
    }
}

// ============ CORS ============

async fn preflight(app: axum::Router, origin: &str) -> axum::response::Response {
    call(
        app,
        Request::builder()
            .method("OPTIONS")
            .uri("/capture-order")
            .header("origin", origin)
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let router = TestApp::new(StubGateway::completed("TXN1"))
        .configure(|c| c.cors_allowed_origins = vec!["https://shop.example.com".into()])
        .router();

    let allowed = preflight(router.clone(), "https://shop.example.com").await;
    assert!(allowed.status().is_success());
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://shop.example.com")
    );

    let denied = preflight(router.clone(), "https://evil.example.net").await;
    assert!(denied.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_cors_defaults_to_any_origin() {
    let router = TestApp::new(StubGateway::completed("TXN1")).router();

    let response = preflight(router, "chrome-extension://abcdefghijklmnop").await;

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

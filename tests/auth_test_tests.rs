mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn auth_test_returns_masked_token_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (app, _store) = app_with(config_for(&server)).await;
    let reply = post_json(&app, "/", json!({ "type": "auth_test", "scope": "analytics" })).await;

    assert_eq!(reply.status, StatusCode::OK, "{}", reply.raw);
    assert_eq!(reply.json["success"], true);
    assert_eq!(reply.json["clientEmail"], CLIENT_EMAIL);
    assert_eq!(reply.json["tokenPresent"], true);
    assert_eq!(reply.json["tokenLength"], ACCESS_TOKEN.len());
    assert_eq!(reply.json["tokenPreview"], "ya29.c...abcd");
    assert_eq!(reply.json["expiresIn"], 3599);
    assert_eq!(
        reply.json["scopes"],
        json!(["https://www.googleapis.com/auth/analytics.readonly"])
    );
    assert!(!reply.raw.contains(ACCESS_TOKEN));
}

#[tokio::test]
async fn rejected_assertion_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid JWT: Token must be a short-lived token"
        })))
        .mount(&server)
        .await;

    let (app, _store) = app_with(config_for(&server)).await;
    let reply = post_json(&app, "/", json!({ "type": "auth_test", "scope": ["gsc"] })).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = reply.json["error"].as_str().unwrap();
    assert!(error.contains("400"), "{error}");
    assert!(error.contains("invalid_grant"), "{error}");
    assert!(!reply.raw.contains("BEGIN PRIVATE KEY"));
}

#[tokio::test]
async fn token_reply_without_access_token_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token_type": "Bearer" })))
        .mount(&server)
        .await;

    let (app, _store) = app_with(config_for(&server)).await;
    let reply = post_json(&app, "/", json!({ "type": "auth_test", "scope": "analytics" })).await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        reply.json["error"]
            .as_str()
            .unwrap()
            .contains("token exchange failed")
    );
}

#[tokio::test]
async fn mixed_scope_without_shared_credential_is_unsupported() {
    let server = MockServer::start().await;
    let (app, _store) = app_with(config_for(&server)).await;
    let reply = post_json(
        &app,
        "/",
        json!({ "type": "auth_test", "scope": "analytics webmasters" }),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        reply.json["error"]
            .as_str()
            .unwrap()
            .contains("unsupported scope")
    );
}

#[tokio::test]
async fn broken_source_credentials_fail_only_that_source() {
    let server = MockServer::start().await;
    let mut cfg = config_for(&server);
    cfg.gsc_private_key = Some("MIIEvQIBADANBgkqhkiG9w0BAQEFAASC".to_string());
    let (app, _store) = app_with(cfg).await;

    let reply = post_json(
        &app,
        "/",
        json!({ "sources": ["search-console"], "startDate": "2024-01-01", "endDate": "2024-01-01" }),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    let gsc = &reply.json["details"]["search-console"];
    assert_eq!(gsc["success"], false);
    assert!(gsc["message"].as_str().unwrap().contains("credential"));
}

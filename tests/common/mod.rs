#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use metrics_sync::config::Config;
use metrics_sync::db::{RecordStore, SqliteStore};
use metrics_sync::router::{SyncState, sync_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const KEY_PEM: &str = include_str!("../fixtures/service_account_key.pem");
pub const CLIENT_EMAIL: &str = "metrics-sync@test-project.iam.gserviceaccount.com";
pub const ACCESS_TOKEN: &str = "ya29.c.test-access-token-0123456789-abcd";
pub const PROPERTY_ID: &str = "123456";

/// Config with every provider pointed at `server`.
pub fn config_for(server: &MockServer) -> Config {
    let base = server.uri();
    let url = |p: &str| Url::parse(&format!("{base}/{p}")).expect("mock url");

    let mut cfg = Config::default();
    cfg.google_token_uri = url("token");
    cfg.ga4_api_base = url("ga4");
    cfg.gsc_api_base = url("gsc");
    cfg.pagespeed_api_base = url("pagespeed");
    cfg.clarity_api_base = url("clarity");

    cfg.ga4_client_email = Some(CLIENT_EMAIL.to_string());
    cfg.ga4_private_key = Some(KEY_PEM.to_string());
    cfg.gsc_client_email = Some(CLIENT_EMAIL.to_string());
    cfg.gsc_private_key = Some(KEY_PEM.to_string());

    cfg.ga4_property_id = Some(PROPERTY_ID.to_string());
    cfg.gsc_site_url = Some("https://shop.example/".to_string());
    cfg.wc_site_url = Some(format!("{base}/shop"));
    cfg.wc_consumer_key = Some("ck_test".to_string());
    cfg.wc_consumer_secret = Some("cs_test".to_string());
    cfg.pagespeed_api_key = Some("psi-key".to_string());
    cfg.clarity_api_token = Some("clarity-token".to_string());
    cfg
}

pub async fn app_with(cfg: Config) -> (Router, Arc<SqliteStore>) {
    let store = Arc::new(
        SqliteStore::connect("sqlite::memory:")
            .await
            .expect("in-memory store"),
    );
    let shared: Arc<dyn RecordStore> = store.clone();
    let state = SyncState::new(Arc::new(cfg), reqwest::Client::new(), shared);
    (sync_router(state), store)
}

pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw: String,
    pub json: Value,
}

pub async fn send(app: &Router, request: Request<Body>) -> Reply {
    let resp = app
        .clone()
        .oneshot(request)
        .await
        .expect("request failed");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let raw = String::from_utf8(body.to_vec()).expect("response body was not utf-8");
    let json = serde_json::from_str(&raw).unwrap_or(Value::Null);
    Reply {
        status,
        headers,
        raw,
        json,
    }
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Reply {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("failed to build request"),
    )
    .await
}

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::RecordStore;
use crate::error::SyncError;
use crate::handlers::{env_check::env_check_handler, sync::sync_handler};
use crate::middleware::cors::{cors_headers, preflight};
use crate::service::SyncEngine;

const USER_AGENT: &str = concat!("metrics-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct SyncState {
    pub config: Arc<Config>,
    pub engine: SyncEngine,
}

impl SyncState {
    pub fn new(config: Arc<Config>, http: reqwest::Client, store: Arc<dyn RecordStore>) -> Self {
        let engine = SyncEngine::new(config.clone(), http, store);
        Self { config, engine }
    }
}

/// Outbound client shared by the token exchange and every connector.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client, SyncError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(config.http_timeout_secs));
    if let Some(proxy_url) = config.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

pub fn sync_router(state: SyncState) -> Router {
    Router::new()
        .route("/", post(sync_handler).options(preflight))
        .route(
            "/sync-external-data",
            post(sync_handler).options(preflight),
        )
        .route("/env-check", get(env_check_handler).options(preflight))
        .layer(from_fn(cors_headers))
        .with_state(state)
}

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::middleware::RequireSyncKey;
use crate::router::SyncState;
use crate::service::orchestrator::VERSION;

#[derive(Debug, Serialize)]
pub struct EnvCheckReport {
    pub version: &'static str,
    /// Entry name -> whether it is set. Values are never echoed.
    pub environment: BTreeMap<&'static str, bool>,
    pub timestamp: DateTime<Utc>,
}

/// GET /env-check
pub async fn env_check_handler(
    State(state): State<SyncState>,
    _auth: RequireSyncKey,
) -> Json<EnvCheckReport> {
    Json(EnvCheckReport {
        version: VERSION,
        environment: state.config.presence().into_iter().collect(),
        timestamp: Utc::now(),
    })
}

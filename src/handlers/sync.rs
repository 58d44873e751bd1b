use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::error::SyncError;
use crate::middleware::{RequireSyncKey, SyncInvocation};
use crate::router::SyncState;

/// POST / and POST /sync-external-data -> runs one invocation.
///
/// 200 when every requested source succeeded, 500 otherwise; the body
/// carries the itemized results either way.
pub async fn sync_handler(
    State(state): State<SyncState>,
    _auth: RequireSyncKey,
    SyncInvocation(body): SyncInvocation,
) -> Result<Response, SyncError> {
    info!(
        sync_type = body.sync_type.as_deref().unwrap_or("-"),
        sources = ?body.sources,
        start_date = body.start_date.as_deref().unwrap_or("-"),
        end_date = body.end_date.as_deref().unwrap_or("-"),
        "sync invocation received"
    );
    let response = state.engine.handle(body).await?;
    let status = if response.success() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(response)).into_response())
}

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::SyncError;
use crate::types::sync::SyncRequestBody;

/// Parsed invocation body. An empty body parses as `{}`.
///
/// Malformed JSON is fatal for the invocation and answered with `500 {error}`.
pub struct SyncInvocation(pub SyncRequestBody);

impl<S> FromRequest<S> for SyncInvocation
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SyncInvocation(SyncRequestBody::default()));
        }

        let body: SyncRequestBody = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "rejecting malformed invocation body");
            SyncError::RequestValidation(format!("invalid JSON body: {e}")).into_response()
        })?;
        Ok(SyncInvocation(body))
    }
}

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::router::SyncState;

fn matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Check the invocation key when one is configured.
/// Accepts either:
/// - Header: `Authorization: Bearer <key>`
/// - Header: `x-sync-key: <key>`
/// - Query string: `?key=...`
///
/// With no `SYNC_KEY` set every request passes.
pub fn ensure_authorized(
    expected: Option<&str>,
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<(), Response> {
    let Some(expected) = expected else {
        return Ok(());
    };

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && matches(token.trim(), expected)
        {
            return Ok(());
        }
    }

    if let Some(hv) = headers.get("x-sync-key").and_then(|v| v.to_str().ok())
        && matches(hv.trim(), expected)
    {
        return Ok(());
    }

    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            if k == "key" && matches(&v, expected) {
                return Ok(());
            }
        }
    }

    warn!("rejected invocation with invalid or missing sync key");
    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized", "reason": "invalid or missing key"})),
    )
        .into_response())
}

#[derive(Debug, Clone, Copy)]
pub struct RequireSyncKey;

impl FromRequestParts<SyncState> for RequireSyncKey {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SyncState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(
            state.config.sync_key.as_deref(),
            &parts.headers,
            parts.uri.query(),
        )?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn no_configured_key_lets_everything_through() {
        assert!(ensure_authorized(None, &HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn key_is_accepted_from_any_carrier() {
        let mut bearer = HeaderMap::new();
        bearer.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert!(ensure_authorized(Some("s3cret"), &bearer, None).is_ok());

        let mut custom = HeaderMap::new();
        custom.insert("x-sync-key", HeaderValue::from_static("s3cret"));
        assert!(ensure_authorized(Some("s3cret"), &custom, None).is_ok());

        assert!(ensure_authorized(Some("s3cret"), &HeaderMap::new(), Some("a=1&key=s3cret")).is_ok());
    }

    #[test]
    fn wrong_key_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert("x-sync-key", HeaderValue::from_static("nope"));
        let rejected = ensure_authorized(Some("s3cret"), &headers, Some("key=s3cre")).unwrap_err();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    }
}

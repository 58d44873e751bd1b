use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type, x-sync-key";
pub const ALLOW_METHODS: &str = "POST, GET, OPTIONS";

pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
}

/// Stamp the permissive CORS headers on every response, errors included.
pub async fn cors_headers(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    apply_cors_headers(resp.headers_mut());
    resp
}

/// `OPTIONS` preflight: empty body, headers added by [`cors_headers`].
pub async fn preflight() -> impl IntoResponse {
    StatusCode::OK
}

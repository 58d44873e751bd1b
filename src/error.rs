use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SyncError {
    #[error("invalid private key format: {0}")]
    KeyFormat(String),

    #[error("could not resolve service-account credentials: {0}")]
    CredentialResolution(String),

    #[error("unsupported scope set: {0}")]
    UnsupportedScope(String),

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("{source_name} API error ({status}): {body}")]
    SourceFetch {
        source_name: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to write {table}: {reason}")]
    SourceWrite { table: &'static str, reason: String },

    #[error("unexpected {source_name} payload: {reason}")]
    Transform {
        source_name: &'static str,
        reason: String,
    },

    #[error("invalid request: {0}")]
    RequestValidation(String),

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("JWT signing failed: {0}")]
    Signing(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Auth-boundary failures, as opposed to connector or store failures.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            SyncError::KeyFormat(_)
                | SyncError::CredentialResolution(_)
                | SyncError::UnsupportedScope(_)
                | SyncError::TokenExchange { .. }
                | SyncError::Signing(_)
        )
    }
}

/// Body of every fatal response: `{ "error": "<message>" }`.
#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

impl IntoResponse for SyncError {
    fn into_response(self) -> axum::response::Response {
        let body = ApiErrorResponse {
            error: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

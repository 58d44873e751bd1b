use crate::error::SyncError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Bearer token returned by the token endpoint. Lives for one invocation only.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_in: Option<i64>,
}

#[derive(Serialize)]
struct JwtBearerForm<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Stateless token endpoint calls.
pub(super) struct TokenEndpoint;

impl TokenEndpoint {
    /// POST the signed assertion and pull `access_token` out of the reply.
    ///
    /// Non-2xx responses keep the status and raw body verbatim; Google's
    /// `invalid_grant` bodies are the only way to tell clock skew from a bad
    /// key or a scope the account was never granted.
    pub(super) async fn exchange_assertion(
        http_client: &reqwest::Client,
        token_uri: &str,
        assertion: &str,
    ) -> Result<AccessToken, SyncError> {
        let resp = http_client
            .post(token_uri)
            .form(&JwtBearerForm {
                grant_type: JWT_BEARER_GRANT,
                assertion,
            })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "token endpoint rejected assertion");
            return Err(SyncError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|_| SyncError::TokenExchange {
                status: status.as_u16(),
                body: body.clone(),
            })?;
        let Some(token) = parsed.access_token.filter(|t| !t.is_empty()) else {
            warn!(status = status.as_u16(), "token endpoint reply has no access_token");
            return Err(SyncError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        };

        info!(
            status = status.as_u16(),
            expires_in = parsed.expires_in.unwrap_or_default(),
            "access token obtained"
        );
        Ok(AccessToken {
            token: SecretString::new(token),
            expires_in: parsed.expires_in,
        })
    }
}

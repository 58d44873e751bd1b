use super::credentials::{self, ServiceAccountCredential};
use super::endpoints::{AccessToken, TokenEndpoint};
use super::jwt::{JwtClaims, JwtHeader, sign_assertion};
use super::pem::{check_format, decode_pkcs8};
use crate::config::Config;
use crate::error::SyncError;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Composes credential resolution, assertion signing and token exchange.
///
/// Holds no token cache: every call derives a fresh token.
#[derive(Clone)]
pub struct GoogleAuth {
    config: Arc<Config>,
    http_client: reqwest::Client,
}

impl GoogleAuth {
    pub fn new(config: Arc<Config>, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Resolve credentials for `scopes` and exchange a fresh assertion for a bearer token.
    pub async fn access_token(&self, scopes: &[String]) -> Result<AccessToken, SyncError> {
        let credential = credentials::resolve(&self.config, scopes)?;
        self.exchange(&credential).await
    }

    pub async fn exchange(
        &self,
        credential: &ServiceAccountCredential,
    ) -> Result<AccessToken, SyncError> {
        let token_uri = self.config.google_token_uri.as_str();
        info!(
            client_email = %credential.client_email,
            key_format = check_format(credential.private_key_pem()).as_str(),
            scopes = %credential.scopes.join(" "),
            "requesting access token"
        );

        let der = decode_pkcs8(credential.private_key_pem())?;
        let claims = JwtClaims::for_service_account(
            &credential.client_email,
            token_uri,
            &credential.scopes,
            Utc::now().timestamp(),
        );
        let assertion = sign_assertion(&JwtHeader::default(), &claims, &der)?;

        TokenEndpoint::exchange_assertion(&self.http_client, token_uri, &assertion).await
    }
}

/// `abcdef…wxyz`-style preview that never reveals the middle of a secret.
pub fn mask_secret(secret: &str) -> String {
    const HEAD: usize = 6;
    const TAIL: usize = 4;
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= HEAD + TAIL {
        return "*".repeat(chars.len().min(8));
    }
    let head: String = chars[..HEAD].iter().collect();
    let tail: String = chars[chars.len() - TAIL..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_only_edges() {
        let token = "ya29.a0AfH6SMBx-very-long-secret-token-body-1234";
        let masked = mask_secret(token);
        assert_eq!(masked, "ya29.a...1234");
        assert!(!masked.contains("secret"));
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret(""), "");
        assert_eq!(mask_secret("0123456789"), "********");
    }
}

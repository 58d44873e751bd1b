use crate::config::{ANALYTICS_SCOPE, Config, SEARCH_CONSOLE_SCOPE};
use crate::error::SyncError;
use crate::google_oauth::pem::{check_format, decode_pkcs8};
use ring::signature::RsaKeyPair;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Service-account identity used to sign one assertion. Never persisted.
#[derive(Clone)]
pub struct ServiceAccountCredential {
    pub client_email: String,
    pub private_key: SecretString,
    pub scopes: Vec<String>,
}

impl fmt::Debug for ServiceAccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredential")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Shape of a Google service-account key file (only the fields we need).
#[derive(Deserialize)]
struct ServiceAccountKeyFile {
    #[serde(default)]
    client_email: String,
    #[serde(default)]
    private_key: String,
}

/// API family a scope belongs to; each family may carry its own discrete key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFamily {
    Analytics,
    SearchConsole,
}

impl ScopeFamily {
    pub fn of(scopes: &[String]) -> Option<Self> {
        if scopes.is_empty() {
            return None;
        }
        if scopes.iter().all(|s| s == ANALYTICS_SCOPE) {
            Some(ScopeFamily::Analytics)
        } else if scopes.iter().all(|s| s == SEARCH_CONSOLE_SCOPE) {
            Some(ScopeFamily::SearchConsole)
        } else {
            None
        }
    }
}

/// Where a credential candidate came from. Logged on fall-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    EmbeddedJson,
    KeyFile,
    ScopedPair(ScopeFamily),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::EmbeddedJson => f.write_str("GA4_GSC_SERVICE_ACCOUNT_KEY"),
            CredentialSource::KeyFile => f.write_str("GOOGLE_APPLICATION_CREDENTIALS"),
            CredentialSource::ScopedPair(ScopeFamily::Analytics) => {
                f.write_str("GA4_CLIENT_EMAIL/GA4_PRIVATE_KEY")
            }
            CredentialSource::ScopedPair(ScopeFamily::SearchConsole) => {
                f.write_str("GSC_CLIENT_EMAIL/GSC_PRIVATE_KEY")
            }
        }
    }
}

/// Resolve a credential for `scopes`, trying each configured source in turn:
/// embedded JSON blob, key file, then the pair bound to the scope family.
///
/// A candidate is accepted once it yields a non-empty email and a key whose
/// PEM armor is intact; anything else falls through to the next candidate.
pub fn resolve(config: &Config, scopes: &[String]) -> Result<ServiceAccountCredential, SyncError> {
    let mut rejected: Vec<String> = Vec::new();

    if let Some(blob) = config.ga4_gsc_service_account_key.as_deref() {
        match from_json_blob(blob, scopes) {
            Ok(cred) => return accept(CredentialSource::EmbeddedJson, cred, &mut rejected),
            Err(e) => reject(CredentialSource::EmbeddedJson, e, &mut rejected),
        }
    }

    if let Some(path) = config.google_application_credentials.as_deref() {
        match from_key_file(path, scopes) {
            Ok(cred) => return accept(CredentialSource::KeyFile, cred, &mut rejected),
            Err(e) => reject(CredentialSource::KeyFile, e, &mut rejected),
        }
    }

    let Some(family) = ScopeFamily::of(scopes) else {
        return Err(SyncError::UnsupportedScope(format!(
            "no credential pair is bound to [{}]{}",
            scopes.join(", "),
            summarize(&rejected)
        )));
    };
    let source = CredentialSource::ScopedPair(family);
    let (email, key) = match family {
        ScopeFamily::Analytics => (&config.ga4_client_email, &config.ga4_private_key),
        ScopeFamily::SearchConsole => (&config.gsc_client_email, &config.gsc_private_key),
    };
    match from_pair(email.as_deref(), key.as_deref(), scopes) {
        Ok(cred) => accept(source, cred, &mut rejected),
        Err(e) => {
            reject(source, e, &mut rejected);
            Err(SyncError::CredentialResolution(format!(
                "no usable credential source{}",
                summarize(&rejected)
            )))
        }
    }
}

fn accept(
    source: CredentialSource,
    cred: ServiceAccountCredential,
    rejected: &mut Vec<String>,
) -> Result<ServiceAccountCredential, SyncError> {
    info!(
        source = %source,
        client_email = %cred.client_email,
        key_format = "ok",
        skipped = rejected.len(),
        "resolved service-account credential"
    );
    Ok(cred)
}

fn reject(source: CredentialSource, err: SyncError, rejected: &mut Vec<String>) {
    warn!(source = %source, error = %err, "credential candidate rejected; trying next");
    rejected.push(format!("{source}: {err}"));
}

fn summarize(rejected: &[String]) -> String {
    if rejected.is_empty() {
        String::new()
    } else {
        format!(" (tried {})", rejected.join("; "))
    }
}

fn from_json_blob(blob: &str, scopes: &[String]) -> Result<ServiceAccountCredential, SyncError> {
    let parsed: ServiceAccountKeyFile = serde_json::from_str(blob.trim())?;
    from_pair(Some(&parsed.client_email), Some(&parsed.private_key), scopes)
}

fn from_key_file(path: &Path, scopes: &[String]) -> Result<ServiceAccountCredential, SyncError> {
    let contents = std::fs::read_to_string(path)?;
    from_json_blob(&contents, scopes)
}

fn from_pair(
    email: Option<&str>,
    key: Option<&str>,
    scopes: &[String],
) -> Result<ServiceAccountCredential, SyncError> {
    let email = email.map(str::trim).unwrap_or_default();
    let key = key.map(str::trim).unwrap_or_default();
    if email.is_empty() || key.is_empty() {
        return Err(SyncError::CredentialResolution(
            "client email or private key is empty".to_string(),
        ));
    }
    let check = check_format(key);
    if !check.is_ok() {
        return Err(SyncError::KeyFormat(check.as_str().to_string()));
    }
    // Intact armor is not enough: the body must decode to a key ring accepts.
    let der = decode_pkcs8(key)?;
    RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| SyncError::KeyFormat(format!("key rejected by RSA parser: {e}")))?;
    Ok(ServiceAccountCredential {
        client_email: email.to_string(),
        private_key: SecretString::new(key.to_string()),
        scopes: scopes.to_vec(),
    })
}

impl ServiceAccountCredential {
    pub fn private_key_pem(&self) -> &str {
        self.private_key.expose_secret()
    }
}

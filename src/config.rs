use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use url::Url;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const GA4_API_BASE: &str = "https://analyticsdata.googleapis.com/v1beta";
pub const GSC_API_BASE: &str = "https://www.googleapis.com/webmasters/v3";
pub const PAGESPEED_API_BASE: &str = "https://www.googleapis.com/pagespeedonline/v5";
pub const CLARITY_API_BASE: &str = "https://api.clarity.ms/v1";

pub const ANALYTICS_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
pub const SEARCH_CONSOLE_SCOPE: &str = "https://www.googleapis.com/auth/webmasters.readonly";

/// Default lookback window: `end = yesterday`, `start = end - 29 days`.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 29;

/// Runtime configuration, read once from the process environment.
///
/// Keys map 1:1 to upper-cased environment variables (`WC_SITE_URL` ->
/// `wc_site_url`). Nothing in the engine mutates it after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    pub loglevel: String,
    pub proxy: Option<Url>,
    pub http_timeout_secs: u64,
    pub sync_lookback_days: u32,
    #[serde(deserialize_with = "lenient_string")]
    pub sync_key: Option<String>,

    // Service-account credential sources, in precedence order.
    #[serde(deserialize_with = "lenient_string")]
    pub ga4_gsc_service_account_key: Option<String>,
    pub google_application_credentials: Option<PathBuf>,
    #[serde(deserialize_with = "lenient_string")]
    pub ga4_client_email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ga4_private_key: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub gsc_client_email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub gsc_private_key: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub wc_site_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub wc_consumer_key: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub wc_consumer_secret: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ga4_property_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub gsc_site_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub pagespeed_api_key: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub clarity_api_token: Option<String>,

    pub google_token_uri: Url,
    pub ga4_api_base: Url,
    pub gsc_api_base: Url,
    pub pagespeed_api_base: Url,
    pub clarity_api_base: Url,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://metrics-sync.db".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            proxy: None,
            http_timeout_secs: 60,
            sync_lookback_days: DEFAULT_LOOKBACK_DAYS,
            sync_key: None,
            ga4_gsc_service_account_key: None,
            google_application_credentials: None,
            ga4_client_email: None,
            ga4_private_key: None,
            gsc_client_email: None,
            gsc_private_key: None,
            wc_site_url: None,
            wc_consumer_key: None,
            wc_consumer_secret: None,
            ga4_property_id: None,
            gsc_site_url: None,
            pagespeed_api_key: None,
            clarity_api_token: None,
            google_token_uri: static_url(GOOGLE_TOKEN_URI),
            ga4_api_base: static_url(GA4_API_BASE),
            gsc_api_base: static_url(GSC_API_BASE),
            pagespeed_api_base: static_url(PAGESPEED_API_BASE),
            clarity_api_base: static_url(CLARITY_API_BASE),
        }
    }
}

impl Config {
    /// Defaults overlaid with the raw (unprefixed) process environment.
    pub fn from_env() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw())
            .extract()
    }

    /// Presence flags for every externally supplied entry. Values are never exposed.
    pub fn presence(&self) -> Vec<(&'static str, bool)> {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        vec![
            ("DATABASE_URL", !self.database_url.is_empty()),
            ("GA4_GSC_SERVICE_ACCOUNT_KEY", set(&self.ga4_gsc_service_account_key)),
            (
                "GOOGLE_APPLICATION_CREDENTIALS",
                self.google_application_credentials.is_some(),
            ),
            ("GA4_CLIENT_EMAIL", set(&self.ga4_client_email)),
            ("GA4_PRIVATE_KEY", set(&self.ga4_private_key)),
            ("GSC_CLIENT_EMAIL", set(&self.gsc_client_email)),
            ("GSC_PRIVATE_KEY", set(&self.gsc_private_key)),
            ("GA4_PROPERTY_ID", set(&self.ga4_property_id)),
            ("GSC_SITE_URL", set(&self.gsc_site_url)),
            ("WC_SITE_URL", set(&self.wc_site_url)),
            ("WC_CONSUMER_KEY", set(&self.wc_consumer_key)),
            ("WC_CONSUMER_SECRET", set(&self.wc_consumer_secret)),
            ("PAGESPEED_API_KEY", set(&self.pagespeed_api_key)),
            ("CLARITY_API_TOKEN", set(&self.clarity_api_token)),
            ("SYNC_KEY", set(&self.sync_key)),
        ]
    }
}

fn static_url(s: &str) -> Url {
    Url::parse(s).unwrap_or_else(|e| panic!("built-in endpoint {s} is not a valid URL: {e}"))
}

/// Join a path onto an API base without dropping the base's own path segments.
pub fn endpoint(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Figment parses env values (`123` becomes a number, `{...}` may become a
/// table). Every string-typed entry accepts whatever came out and turns it
/// back into text; blank values count as unset.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(v) => Some(v.to_string()),
    };
    Ok(text.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let base = Url::parse("https://analyticsdata.googleapis.com/v1beta/").unwrap();
        assert_eq!(
            endpoint(&base, "/properties/1:runReport"),
            "https://analyticsdata.googleapis.com/v1beta/properties/1:runReport"
        );
    }

    #[test]
    fn numeric_env_values_become_strings() {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Serialized::default("ga4_property_id", 123456))
            .merge(Serialized::default("wc_site_url", ""))
            .extract()
            .unwrap();
        assert_eq!(cfg.ga4_property_id.as_deref(), Some("123456"));
        assert_eq!(cfg.wc_site_url, None);
        assert_eq!(cfg.sync_lookback_days, DEFAULT_LOOKBACK_DAYS);
    }
}

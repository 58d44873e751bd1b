use crate::config::{ANALYTICS_SCOPE, Config, SEARCH_CONSOLE_SCOPE};
use crate::db::store::RecordStore;
use crate::error::SyncError;
use crate::google_oauth::{GoogleAuth, credentials, mask_secret};
use crate::service::pipeline::SyncContext;
use crate::types::sync::{
    AuthTestReport, DateRange, ScopeParam, SourceId, SourceResult, StatusReport, SyncRequestBody,
    SyncResponse, SyncResult,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use secrecy::ExposeSecret;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Names answered without touching any connector.
pub const PSEUDO_SOURCES: [&str; 2] = ["status", "auth_test"];

/// What a request body asks for, after aliases are folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPlan {
    Status,
    AuthTest { scopes: Vec<String> },
    Sources {
        sources: BTreeSet<SourceId>,
        unknown: Vec<String>,
    },
}

/// Entry point for one invocation. Cheap to clone; shares the client and store pools.
#[derive(Clone)]
pub struct SyncEngine {
    config: Arc<Config>,
    http: reqwest::Client,
    store: Arc<dyn RecordStore>,
    auth: GoogleAuth,
}

impl SyncEngine {
    pub fn new(config: Arc<Config>, http: reqwest::Client, store: Arc<dyn RecordStore>) -> Self {
        let auth = GoogleAuth::new(config.clone(), http.clone());
        Self {
            config,
            http,
            store,
            auth,
        }
    }

    pub async fn handle(&self, body: SyncRequestBody) -> Result<SyncResponse, SyncError> {
        self.handle_at(body, Utc::now()).await
    }

    /// As [`handle`](Self::handle), with the clock supplied by the caller.
    pub async fn handle_at(
        &self,
        body: SyncRequestBody,
        now: DateTime<Utc>,
    ) -> Result<SyncResponse, SyncError> {
        match plan(&body)? {
            SyncPlan::Status => Ok(SyncResponse::Status(self.status(now))),
            SyncPlan::AuthTest { scopes } => self.auth_test(scopes).await.map(SyncResponse::AuthTest),
            SyncPlan::Sources { sources, unknown } => {
                let range = resolve_range(&body, now.date_naive(), self.config.sync_lookback_days)?;
                let page_urls = if sources.contains(&SourceId::PagePerformance) {
                    parse_page_urls(body.page_urls.as_deref().unwrap_or_default())?
                } else {
                    Vec::new()
                };
                let project_id = body
                    .project_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty());

                let ctx = SyncContext {
                    config: self.config.clone(),
                    http: self.http.clone(),
                    store: self.store.clone(),
                    auth: self.auth.clone(),
                    range,
                    today: now.date_naive(),
                    synced_at: now,
                };
                let result = run(&ctx, &sources, &unknown, &page_urls, project_id).await;
                info!(
                    success = result.success,
                    start = %range.start_date,
                    end = %range.end_date,
                    "sync invocation finished"
                );
                Ok(SyncResponse::Sync(result))
            }
        }
    }

    fn status(&self, now: DateTime<Utc>) -> StatusReport {
        StatusReport {
            success: true,
            status: "online",
            version: VERSION,
            available_sources: SourceId::ALL.iter().map(|s| s.name()).collect(),
            pseudo_sources: PSEUDO_SOURCES.to_vec(),
            default_lookback_days: self.config.sync_lookback_days,
            timestamp: now,
        }
    }

    /// Resolve and exchange only; the token itself never leaves this function.
    async fn auth_test(&self, scopes: Vec<String>) -> Result<AuthTestReport, SyncError> {
        let credential = credentials::resolve(&self.config, &scopes)?;
        let token = self.auth.exchange(&credential).await?;
        let secret = token.token.expose_secret();
        info!(
            client_email = %credential.client_email,
            token_preview = %mask_secret(secret),
            "auth test succeeded"
        );
        Ok(AuthTestReport {
            success: true,
            scopes,
            client_email: credential.client_email.clone(),
            token_present: !secret.is_empty(),
            token_length: secret.len(),
            token_preview: mask_secret(secret),
            expires_in: token.expires_in,
        })
    }
}

/// Run the requested connectors one after another in fixed order.
async fn run(
    ctx: &SyncContext,
    sources: &BTreeSet<SourceId>,
    unknown: &[String],
    page_urls: &[Url],
    project_id: Option<&str>,
) -> SyncResult {
    let mut parts: Vec<(String, SourceResult)> = Vec::new();
    let mut ga4_parts: Vec<(String, SourceResult)> = Vec::new();

    for &source in sources {
        let result = match source {
            SourceId::Orders => ctx.sync_orders().await,
            SourceId::SearchConsole => ctx.sync_search_console().await,
            SourceId::ChannelAnalytics => ctx.sync_channel_analytics().await,
            SourceId::PageBehavior => ctx.sync_page_behavior().await,
            SourceId::PagePerformance if page_urls.is_empty() => {
                SourceResult::skipped("pageUrls is required for page-performance")
            }
            SourceId::PagePerformance => ctx.sync_page_performance(page_urls).await,
            SourceId::SessionMetrics => match project_id {
                Some(project) => ctx.sync_session_metrics(project).await,
                None => SourceResult::skipped("projectId is required for session-metrics"),
            },
        };
        if source.is_ga4() {
            ga4_parts.push((source.name().to_string(), result));
            // Both GA4 connectors sit next to each other in execution order.
            let next_is_ga4 = sources.range(source..).nth(1).is_some_and(|s| s.is_ga4());
            if !next_is_ga4 {
                parts.push(("ga4".to_string(), SourceResult::composite(std::mem::take(&mut ga4_parts))));
            }
        } else {
            parts.push((source.name().to_string(), result));
        }
    }

    for name in unknown {
        warn!(source = %name, "unknown data source requested");
        let message = format!("Unknown data source: {name}");
        parts.push((name.clone(), SourceResult::failed(message.clone(), message)));
    }

    SyncResult::aggregate(parts, ctx.range)
}

/// Fold a request body into a [`SyncPlan`].
///
/// A non-empty `sources` array wins over `type`. Pseudo-sources must be the
/// only name requested.
pub fn plan(body: &SyncRequestBody) -> Result<SyncPlan, SyncError> {
    let (names, legacy) = match (&body.sources, &body.sync_type) {
        (Some(list), _) if !list.is_empty() => (list.clone(), false),
        (_, Some(single)) if !single.trim().is_empty() => (vec![single.clone()], true),
        _ => {
            return Err(SyncError::RequestValidation(
                "either `sources` or `type` is required".to_string(),
            ));
        }
    };
    let names: Vec<String> = names.iter().map(|n| n.trim().to_ascii_lowercase()).collect();

    if let Some(pseudo) = names.iter().find(|n| PSEUDO_SOURCES.contains(&n.as_str())) {
        if names.len() > 1 {
            return Err(SyncError::RequestValidation(format!(
                "`{pseudo}` cannot be combined with other sources"
            )));
        }
        return match pseudo.as_str() {
            "status" => Ok(SyncPlan::Status),
            _ => Ok(SyncPlan::AuthTest {
                scopes: parse_scopes(body.scope.as_ref())?,
            }),
        };
    }

    let mut sources = BTreeSet::new();
    let mut unknown: Vec<String> = Vec::new();
    for name in names {
        let expanded: &[SourceId] = match name.as_str() {
            "all" => &SourceId::ALL,
            "orders" | "woocommerce" => &[SourceId::Orders],
            "search-console" | "gsc" => &[SourceId::SearchConsole],
            "ga4" => &[SourceId::ChannelAnalytics, SourceId::PageBehavior],
            "channel-analytics" if legacy => &[SourceId::ChannelAnalytics, SourceId::PageBehavior],
            "channel-analytics" => &[SourceId::ChannelAnalytics],
            "page-behavior" => &[SourceId::PageBehavior],
            "page-performance" | "pagespeed" => &[SourceId::PagePerformance],
            "session-metrics" | "clarity" => &[SourceId::SessionMetrics],
            _ => {
                if !unknown.contains(&name) {
                    unknown.push(name);
                }
                continue;
            }
        };
        sources.extend(expanded.iter().copied());
    }
    Ok(SyncPlan::Sources { sources, unknown })
}

/// Scope aliases (`analytics`, `ga4`, `webmasters`, `gsc`, `search-console`)
/// or full scope URIs, space- or comma-separated.
pub fn parse_scopes(scope: Option<&ScopeParam>) -> Result<Vec<String>, SyncError> {
    let raw: Vec<&str> = match scope {
        Some(ScopeParam::One(s)) => vec![s.as_str()],
        Some(ScopeParam::Many(list)) => list.iter().map(String::as_str).collect(),
        None => Vec::new(),
    };
    let mut scopes: Vec<String> = Vec::new();
    for token in raw
        .into_iter()
        .flat_map(|s| s.split(|c: char| c.is_whitespace() || c == ','))
        .filter(|t| !t.is_empty())
    {
        let resolved = match token.to_ascii_lowercase().as_str() {
            "analytics" | "ga4" => ANALYTICS_SCOPE.to_string(),
            "webmasters" | "gsc" | "search-console" => SEARCH_CONSOLE_SCOPE.to_string(),
            _ if token.starts_with("https://") => token.to_string(),
            _ => {
                return Err(SyncError::RequestValidation(format!("unknown scope `{token}`")));
            }
        };
        if !scopes.contains(&resolved) {
            scopes.push(resolved);
        }
    }
    if scopes.is_empty() {
        return Err(SyncError::RequestValidation(
            "`scope` is required for auth_test".to_string(),
        ));
    }
    Ok(scopes)
}

fn parse_date(raw: Option<&str>, field: &str) -> Result<Option<NaiveDate>, SyncError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => {
            let invalid =
                || SyncError::RequestValidation(format!("`{field}` must be YYYY-MM-DD, got `{s}`"));
            // chrono accepts unpadded months and days; the wire format does not.
            let bytes = s.as_bytes();
            if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
                return Err(invalid());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| invalid())
        }
    }
}

/// Explicit dates win; otherwise `end = today - 1` and `start = end - lookback_days`.
pub fn resolve_range(
    body: &SyncRequestBody,
    today: NaiveDate,
    lookback_days: u32,
) -> Result<DateRange, SyncError> {
    let start = parse_date(body.start_date.as_deref(), "startDate")?;
    let end = parse_date(body.end_date.as_deref(), "endDate")?;

    let end_date = match end {
        Some(d) => d,
        None => today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| SyncError::RequestValidation("date out of range".to_string()))?,
    };
    let start_date = match start {
        Some(d) => d,
        None => end_date
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .ok_or_else(|| SyncError::RequestValidation("date out of range".to_string()))?,
    };
    if start_date > end_date {
        return Err(SyncError::RequestValidation(format!(
            "startDate {start_date} is after endDate {end_date}"
        )));
    }
    Ok(DateRange {
        start_date,
        end_date,
    })
}

fn parse_page_urls(raw: &[String]) -> Result<Vec<Url>, SyncError> {
    let mut urls: Vec<Url> = Vec::with_capacity(raw.len());
    for entry in raw {
        let url = Url::parse(entry.trim())
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| {
                SyncError::RequestValidation(format!("pageUrls entry `{entry}` is not an absolute URL"))
            })?;
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    Ok(urls)
}

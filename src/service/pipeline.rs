//! Per-source sync pipelines: fetch, transform, upsert.
//!
//! Every entry point returns a [`SourceResult`]; connector failures are
//! caught here and never reach the orchestrator as errors.

use crate::api::clarity::ClarityApi;
use crate::api::ga4::{self, Ga4Api};
use crate::api::pagespeed::PageSpeedApi;
use crate::api::search_console::SearchConsoleApi;
use crate::api::woocommerce::WooCommerceApi;
use crate::config::{ANALYTICS_SCOPE, Config, SEARCH_CONSOLE_SCOPE};
use crate::db::store::{RecordStore, upsert_records};
use crate::error::SyncError;
use crate::google_oauth::GoogleAuth;
use crate::service::transform;
use crate::types::pagespeed::STRATEGIES;
use crate::types::search_console::SearchDimension;
use crate::types::sync::{DateRange, SourceResult};
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Everything one invocation shares across its pipelines.
#[derive(Clone)]
pub struct SyncContext {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub store: Arc<dyn RecordStore>,
    pub auth: GoogleAuth,
    pub range: DateRange,
    /// Invocation date (UTC); stamps PageSpeed reports.
    pub today: NaiveDate,
    pub synced_at: DateTime<Utc>,
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, SyncError> {
    value.as_deref().ok_or(SyncError::MissingConfig(name))
}

fn settle(label: &str, outcome: Result<usize, SyncError>) -> SourceResult {
    match outcome {
        Ok(count) => {
            info!(source = label, count, "sync finished");
            SourceResult::synced(count, format!("Synced {count} {label} records"))
        }
        Err(e) => {
            warn!(source = label, auth = e.is_auth(), error = %e, "sync failed");
            SourceResult::failed(format!("Error syncing {label}: {e}"), e.to_string())
        }
    }
}

impl SyncContext {
    async fn bearer(&self, scope: &str) -> Result<String, SyncError> {
        let token = self.auth.access_token(&[scope.to_string()]).await?;
        Ok(token.token.expose_secret().to_string())
    }

    pub async fn sync_orders(&self) -> SourceResult {
        settle("WooCommerce orders", self.try_sync_orders().await)
    }

    async fn try_sync_orders(&self) -> Result<usize, SyncError> {
        let site = required(&self.config.wc_site_url, "WC_SITE_URL")?;
        let key = required(&self.config.wc_consumer_key, "WC_CONSUMER_KEY")?;
        let secret = required(&self.config.wc_consumer_secret, "WC_CONSUMER_SECRET")?;

        let orders = WooCommerceApi::fetch_orders(&self.http, site, key, secret, &self.range).await?;
        let records = transform::orders_to_records(orders, self.synced_at)?;
        upsert_records(self.store.as_ref(), records).await
    }

    pub async fn sync_search_console(&self) -> SourceResult {
        settle("Search Console", self.try_sync_search_console().await)
    }

    async fn try_sync_search_console(&self) -> Result<usize, SyncError> {
        let site = required(&self.config.gsc_site_url, "GSC_SITE_URL")?;
        let token = self.bearer(SEARCH_CONSOLE_SCOPE).await?;
        let base = &self.config.gsc_api_base;

        let by_query = SearchConsoleApi::query(
            &self.http,
            base,
            site,
            &token,
            SearchDimension::Query,
            &self.range,
        )
        .await?;
        let by_page = SearchConsoleApi::query(
            &self.http,
            base,
            site,
            &token,
            SearchDimension::Page,
            &self.range,
        )
        .await?;

        let records = transform::merge_search_console(by_query, by_page, self.synced_at)?;
        upsert_records(self.store.as_ref(), records).await
    }

    pub async fn sync_channel_analytics(&self) -> SourceResult {
        settle("GA4 channel", self.try_sync_channel_analytics().await)
    }

    async fn try_sync_channel_analytics(&self) -> Result<usize, SyncError> {
        let property = required(&self.config.ga4_property_id, "GA4_PROPERTY_ID")?;
        let token = self.bearer(ANALYTICS_SCOPE).await?;
        let report = Ga4Api::run_report(
            &self.http,
            &self.config.ga4_api_base,
            property,
            &token,
            &ga4::channel_report(&self.range),
        )
        .await?;
        let records = transform::channel_rows_to_records(report, self.synced_at)?;
        upsert_records(self.store.as_ref(), records).await
    }

    pub async fn sync_page_behavior(&self) -> SourceResult {
        settle("GA4 page behavior", self.try_sync_page_behavior().await)
    }

    async fn try_sync_page_behavior(&self) -> Result<usize, SyncError> {
        let property = required(&self.config.ga4_property_id, "GA4_PROPERTY_ID")?;
        let token = self.bearer(ANALYTICS_SCOPE).await?;
        let report = Ga4Api::run_report(
            &self.http,
            &self.config.ga4_api_base,
            property,
            &token,
            &ga4::page_behavior_report(&self.range),
        )
        .await?;
        let records = transform::page_behavior_rows_to_records(report, self.synced_at)?;
        upsert_records(self.store.as_ref(), records).await
    }

    /// One call per page × strategy. A failed pair is logged and left out;
    /// the rest are still written.
    pub async fn sync_page_performance(&self, page_urls: &[Url]) -> SourceResult {
        const LABEL: &str = "PageSpeed";
        let api_key = match required(&self.config.pagespeed_api_key, "PAGESPEED_API_KEY") {
            Ok(k) => k,
            Err(e) => return settle(LABEL, Err(e)),
        };

        let mut records = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for page in page_urls {
            for strategy in STRATEGIES {
                let outcome = PageSpeedApi::run(
                    &self.http,
                    &self.config.pagespeed_api_base,
                    api_key,
                    page.as_str(),
                    strategy,
                )
                .await;
                match outcome {
                    Ok(resp) => match transform::pagespeed_to_record(
                        page.as_str(),
                        strategy,
                        resp,
                        self.today,
                        self.synced_at,
                    ) {
                        Some(record) => records.push(record),
                        None => {
                            warn!(page = %page, strategy = strategy.as_str(), "no Lighthouse result");
                            failures.push(format!("{page} ({}): no Lighthouse result", strategy.as_str()));
                        }
                    },
                    Err(e) => {
                        warn!(page = %page, strategy = strategy.as_str(), error = %e, "PageSpeed run failed");
                        failures.push(format!("{page} ({}): {e}", strategy.as_str()));
                    }
                }
            }
        }

        if records.is_empty() && !failures.is_empty() {
            return SourceResult::failed(
                format!("Error syncing {LABEL}: all {} runs failed", failures.len()),
                failures.join("; "),
            );
        }
        let written = match upsert_records(self.store.as_ref(), records).await {
            Ok(n) => n,
            Err(e) => return settle(LABEL, Err(e)),
        };
        if failures.is_empty() {
            return settle(LABEL, Ok(written));
        }
        info!(source = LABEL, count = written, failed = failures.len(), "sync finished with failures");
        SourceResult::partial(
            written,
            format!(
                "Synced {written} {LABEL} records; {} runs failed",
                failures.len()
            ),
            &failures,
        )
    }

    pub async fn sync_session_metrics(&self, project_id: &str) -> SourceResult {
        settle("Clarity", self.try_sync_session_metrics(project_id).await)
    }

    async fn try_sync_session_metrics(&self, project_id: &str) -> Result<usize, SyncError> {
        let token = required(&self.config.clarity_api_token, "CLARITY_API_TOKEN")?;
        let metrics = ClarityApi::project_metrics(
            &self.http,
            &self.config.clarity_api_base,
            token,
            project_id,
            &self.range,
        )
        .await?;
        let records = transform::clarity_to_records(metrics, self.range.end_date, self.synced_at)?;
        upsert_records(self.store.as_ref(), records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::types::sync::SourceStatus;

    async fn context(config: Config) -> SyncContext {
        let config = Arc::new(config);
        let http = reqwest::Client::new();
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        SyncContext {
            auth: GoogleAuth::new(config.clone(), http.clone()),
            config,
            http,
            store: Arc::new(store),
            range: DateRange {
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            },
            today: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            synced_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_configuration_fails_before_any_call() {
        let ctx = context(Config::default()).await;

        let orders = ctx.sync_orders().await;
        assert!(!orders.success);
        assert_eq!(orders.status, SourceStatus::Failed);
        assert!(orders.message.contains("WC_SITE_URL"), "{}", orders.message);

        let perf = ctx
            .sync_page_performance(&[Url::parse("https://a.example/").unwrap()])
            .await;
        assert!(!perf.success);
        assert!(perf.message.contains("PAGESPEED_API_KEY"));

        let clarity = ctx.sync_session_metrics("proj").await;
        assert!(clarity.message.contains("CLARITY_API_TOKEN"));
    }
}

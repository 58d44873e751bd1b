use super::ensure_success;
use crate::config::endpoint;
use crate::error::SyncError;
use crate::types::search_console::{
    SearchAnalyticsQuery, SearchAnalyticsResponse, SearchAnalyticsRow, SearchDimension,
};
use crate::types::sync::DateRange;
use tracing::info;
use url::Url;

/// Rows per dimension query. Only the head of each ranking is kept.
pub const SEARCH_CONSOLE_ROW_LIMIT: u32 = 50;

pub struct SearchConsoleApi;

impl SearchConsoleApi {
    /// `POST /sites/{site}/searchAnalytics/query` over (`date`, `dimension`).
    pub async fn query(
        client: &reqwest::Client,
        api_base: &Url,
        site_url: &str,
        access_token: &str,
        dimension: SearchDimension,
        range: &DateRange,
    ) -> Result<Vec<SearchAnalyticsRow>, SyncError> {
        let site: String = url::form_urlencoded::byte_serialize(site_url.as_bytes()).collect();
        let url = endpoint(api_base, &format!("sites/{site}/searchAnalytics/query"));
        let body = SearchAnalyticsQuery {
            start_date: range.start_str(),
            end_date: range.end_str(),
            dimensions: vec!["date".to_string(), dimension.as_str().to_string()],
            row_limit: SEARCH_CONSOLE_ROW_LIMIT,
        };

        let resp = client
            .post(url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?;
        let data: SearchAnalyticsResponse =
            ensure_success("Search Console", resp).await?.json().await?;

        info!(
            dimension = dimension.as_str(),
            rows = data.rows.len(),
            limit = SEARCH_CONSOLE_ROW_LIMIT,
            "retrieved Search Console rows"
        );
        Ok(data.rows)
    }
}

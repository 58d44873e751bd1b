use super::ensure_success;
use crate::config::endpoint;
use crate::error::SyncError;
use crate::types::clarity::ClarityMetric;
use crate::types::sync::DateRange;
use tracing::info;
use url::Url;

pub struct ClarityApi;

impl ClarityApi {
    /// `GET /projects/{id}/metrics` for the range, bearer-token auth.
    pub async fn project_metrics(
        client: &reqwest::Client,
        api_base: &Url,
        api_token: &str,
        project_id: &str,
        range: &DateRange,
    ) -> Result<Vec<ClarityMetric>, SyncError> {
        let project: String = url::form_urlencoded::byte_serialize(project_id.as_bytes()).collect();
        let resp = client
            .get(endpoint(api_base, &format!("projects/{project}/metrics")))
            .bearer_auth(api_token)
            .query(&[
                ("startDate", range.start_str()),
                ("endDate", range.end_str()),
            ])
            .send()
            .await?;
        let metrics: Vec<ClarityMetric> = ensure_success("Clarity", resp).await?.json().await?;

        info!(project_id, rows = metrics.len(), "retrieved Clarity metrics");
        Ok(metrics)
    }
}

use super::ensure_success;
use crate::config::endpoint;
use crate::error::SyncError;
use crate::types::ga4::{
    DateRangeSpec, MetricOrderBy, NamedField, OrderBy, RunReportRequest, RunReportResponse,
};
use crate::types::sync::DateRange;
use tracing::info;
use url::Url;

/// Channel rows are few (source × medium × campaign × day); the cap only guards runaway reports.
pub const CHANNEL_ROW_LIMIT: u32 = 10_000;

/// Top pages by sessions. Page paths are high-cardinality; the long tail is dropped on purpose.
pub const PAGE_BEHAVIOR_ROW_LIMIT: u32 = 200;

pub const CHANNEL_DIMENSIONS: [&str; 4] =
    ["date", "sessionSource", "sessionMedium", "sessionCampaignName"];
pub const CHANNEL_METRICS: [&str; 4] = ["sessions", "totalUsers", "newUsers", "conversions"];

pub const PAGE_BEHAVIOR_DIMENSIONS: [&str; 3] = ["date", "pagePath", "deviceCategory"];
pub const PAGE_BEHAVIOR_METRICS: [&str; 4] = [
    "sessions",
    "engagedSessions",
    "averageSessionDuration",
    "conversions",
];

fn report(
    range: &DateRange,
    dimensions: &[&str],
    metrics: &[&str],
    limit: u32,
    order_metric: &str,
) -> RunReportRequest {
    RunReportRequest {
        date_ranges: vec![DateRangeSpec {
            start_date: range.start_str(),
            end_date: range.end_str(),
        }],
        dimensions: NamedField::list(dimensions),
        metrics: NamedField::list(metrics),
        limit,
        order_bys: vec![OrderBy {
            metric: MetricOrderBy {
                metric_name: order_metric.to_string(),
            },
            desc: true,
        }],
    }
}

/// Traffic by day and acquisition channel, biggest converters first.
pub fn channel_report(range: &DateRange) -> RunReportRequest {
    report(
        range,
        &CHANNEL_DIMENSIONS,
        &CHANNEL_METRICS,
        CHANNEL_ROW_LIMIT,
        "conversions",
    )
}

/// Engagement by day, page and device, busiest pages first.
pub fn page_behavior_report(range: &DateRange) -> RunReportRequest {
    report(
        range,
        &PAGE_BEHAVIOR_DIMENSIONS,
        &PAGE_BEHAVIOR_METRICS,
        PAGE_BEHAVIOR_ROW_LIMIT,
        "sessions",
    )
}

pub struct Ga4Api;

impl Ga4Api {
    /// `POST /properties/{id}:runReport`.
    pub async fn run_report(
        client: &reqwest::Client,
        api_base: &Url,
        property_id: &str,
        access_token: &str,
        request: &RunReportRequest,
    ) -> Result<RunReportResponse, SyncError> {
        let url = endpoint(api_base, &format!("properties/{property_id}:runReport"));
        let resp = client
            .post(url)
            .bearer_auth(access_token)
            .json(request)
            .send()
            .await?;
        let report: RunReportResponse = ensure_success("GA4", resp).await?.json().await?;

        info!(
            property_id,
            rows = report.rows.len(),
            total_rows = report.row_count.unwrap_or_default(),
            limit = request.limit,
            "retrieved GA4 report"
        );
        Ok(report)
    }
}

use super::ensure_success;
use crate::error::SyncError;
use crate::types::sync::DateRange;
use serde_json::Value;
use tracing::info;

/// Orders fetched per invocation: one page of the 100 most recent.
///
/// There is no pagination. Ranges with more orders than this lose the
/// oldest ones, so the sync has to run often enough to stay under the cap.
pub const ORDERS_PAGE_CAP: u32 = 100;

const ORDERS_PATH: &str = "wp-json/wc/v3/orders";

pub struct WooCommerceApi;

impl WooCommerceApi {
    /// `GET /wp-json/wc/v3/orders` with query-string key auth, bounded by the range.
    pub async fn fetch_orders(
        client: &reqwest::Client,
        site_url: &str,
        consumer_key: &str,
        consumer_secret: &str,
        range: &DateRange,
    ) -> Result<Vec<Value>, SyncError> {
        let url = format!("{}/{ORDERS_PATH}", site_url.trim_end_matches('/'));
        let after = format!("{}T00:00:00", range.start_str());
        let before = format!("{}T23:59:59", range.end_str());
        let per_page = ORDERS_PAGE_CAP.to_string();

        let resp = client
            .get(&url)
            .query(&[
                ("consumer_key", consumer_key),
                ("consumer_secret", consumer_secret),
                ("after", after.as_str()),
                ("before", before.as_str()),
                ("per_page", per_page.as_str()),
                ("orderby", "date"),
                ("order", "desc"),
            ])
            .header("Accept", "application/json")
            .send()
            .await?;
        let orders: Vec<Value> = ensure_success("WooCommerce", resp).await?.json().await?;

        info!(count = orders.len(), cap = ORDERS_PAGE_CAP, "retrieved WooCommerce orders");
        Ok(orders)
    }
}

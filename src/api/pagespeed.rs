use super::ensure_success;
use crate::config::endpoint;
use crate::error::SyncError;
use crate::types::pagespeed::{PageSpeedResponse, Strategy};
use url::Url;

pub struct PageSpeedApi;

impl PageSpeedApi {
    /// `GET /runPagespeed` for one page and strategy.
    pub async fn run(
        client: &reqwest::Client,
        api_base: &Url,
        api_key: &str,
        page_url: &str,
        strategy: Strategy,
    ) -> Result<PageSpeedResponse, SyncError> {
        let resp = client
            .get(endpoint(api_base, "runPagespeed"))
            .query(&[
                ("url", page_url),
                ("strategy", strategy.as_str()),
                ("key", api_key),
            ])
            .send()
            .await?;
        Ok(ensure_success("PageSpeed", resp).await?.json().await?)
    }
}

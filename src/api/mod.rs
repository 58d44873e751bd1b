//! Stateless callers for the third-party reporting APIs.
//!
//! Each returns the provider's raw rows; turning them into records and
//! writing them is the pipeline's job.

pub mod clarity;
pub mod ga4;
pub mod pagespeed;
pub mod search_console;
pub mod woocommerce;

use crate::error::SyncError;
use tracing::warn;

/// Pass 2xx responses through; turn anything else into `SourceFetch` with the body verbatim.
pub(crate) async fn ensure_success(
    source_name: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(source = source_name, status = status.as_u16(), body = %body, "upstream API error");
    Err(SyncError::SourceFetch {
        source_name,
        status: status.as_u16(),
        body,
    })
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsQuery {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<String>,
    pub row_limit: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchAnalyticsResponse {
    #[serde(default)]
    pub rows: Vec<SearchAnalyticsRow>,
}

/// `keys` follow the order of the requested dimensions.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchAnalyticsRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

/// Second dimension of a two-dimension (`date`, X) query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDimension {
    Query,
    Page,
}

impl SearchDimension {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchDimension::Query => "query",
            SearchDimension::Page => "page",
        }
    }
}

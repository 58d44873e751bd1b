use serde::Deserialize;
use serde_json::Value;

/// One entry of the Clarity project metrics export.
///
/// Counters come back as numbers or numeric strings depending on the
/// export version, so they are kept raw and coerced by the transformer.
#[derive(Debug, Clone, Deserialize)]
pub struct ClarityMetric {
    #[serde(alias = "url", alias = "pageUrl")]
    pub page: String,
    #[serde(default, alias = "metricDate")]
    pub date: Option<String>,
    #[serde(default, alias = "deadClicks")]
    pub dead_clicks: Option<Value>,
    #[serde(default, alias = "rageClicks")]
    pub rage_clicks: Option<Value>,
    #[serde(default, alias = "excessiveScrolling")]
    pub excessive_scrolling: Option<Value>,
    #[serde(default, alias = "averageScrollDepth")]
    pub average_scroll_depth: Option<Value>,
}

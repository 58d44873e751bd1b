use serde::Deserialize;
use std::collections::HashMap;

/// Lighthouse run strategies requested for every page.
pub const STRATEGIES: [Strategy; 2] = [Strategy::Mobile, Strategy::Desktop];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedResponse {
    #[serde(default)]
    pub lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LighthouseResult {
    #[serde(default)]
    pub categories: HashMap<String, LighthouseCategory>,
    #[serde(default)]
    pub audits: HashMap<String, LighthouseAudit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LighthouseCategory {
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseAudit {
    #[serde(default)]
    pub numeric_value: Option<f64>,
}

impl LighthouseResult {
    pub fn category_score(&self, name: &str) -> Option<f64> {
        self.categories.get(name).and_then(|c| c.score)
    }

    pub fn audit_value(&self, name: &str) -> Option<f64> {
        self.audits.get(name).and_then(|a| a.numeric_value)
    }
}

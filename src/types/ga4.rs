use serde::{Deserialize, Serialize};

/// `runReport` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    pub date_ranges: Vec<DateRangeSpec>,
    pub dimensions: Vec<NamedField>,
    pub metrics: Vec<NamedField>,
    pub limit: u32,
    pub order_bys: Vec<OrderBy>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeSpec {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedField {
    pub name: String,
}

impl NamedField {
    pub fn list(names: &[&str]) -> Vec<NamedField> {
        names
            .iter()
            .map(|n| NamedField {
                name: n.to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    pub metric: MetricOrderBy,
    pub desc: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOrderBy {
    pub metric_name: String,
}

/// `runReport` response; rows are absent when the report is empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
    #[serde(default)]
    pub row_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(default)]
    pub metric_values: Vec<ReportValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportValue {
    #[serde(default)]
    pub value: String,
}

impl ReportRow {
    pub fn dimension(&self, idx: usize) -> Option<&str> {
        self.dimension_values.get(idx).map(|v| v.value.as_str())
    }

    pub fn metric(&self, idx: usize) -> Option<&str> {
        self.metric_values.get(idx).map(|v| v.value.as_str())
    }
}

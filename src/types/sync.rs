use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Invocation body as posted by the scheduler or an operator.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequestBody {
    /// Legacy single selector.
    #[serde(rename = "type", default)]
    pub sync_type: Option<String>,
    /// Takes precedence over `type` when non-empty.
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub page_urls: Option<Vec<String>>,
    #[serde(default, alias = "clarityProjectId")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub scope: Option<ScopeParam>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScopeParam {
    One(String),
    Many(Vec<String>),
}

/// Inclusive date range, echoed back as `{ "startDate", "endDate" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn start_str(&self) -> String {
        self.start_date.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end_date.format("%Y-%m-%d").to_string()
    }
}

/// One concrete connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceId {
    // Declaration order is execution order.
    Orders,
    SearchConsole,
    ChannelAnalytics,
    PageBehavior,
    PagePerformance,
    SessionMetrics,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::Orders,
        SourceId::SearchConsole,
        SourceId::ChannelAnalytics,
        SourceId::PageBehavior,
        SourceId::PagePerformance,
        SourceId::SessionMetrics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SourceId::Orders => "orders",
            SourceId::SearchConsole => "search-console",
            SourceId::ChannelAnalytics => "channel-analytics",
            SourceId::PageBehavior => "page-behavior",
            SourceId::PagePerformance => "page-performance",
            SourceId::SessionMetrics => "session-metrics",
        }
    }

    pub fn is_ga4(self) -> bool {
        matches!(self, SourceId::ChannelAnalytics | SourceId::PageBehavior)
    }
}

/// Tag carried by every per-source result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Synced,
    Partial,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResult {
    pub success: bool,
    pub status: SourceStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, SourceResult>,
}

impl SourceResult {
    pub fn synced(count: usize, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: SourceStatus::Synced,
            message: message.into(),
            count: Some(count),
            error: None,
            details: BTreeMap::new(),
        }
    }

    /// Some items were written, some failed; still a success.
    pub fn partial(count: usize, message: impl Into<String>, failures: &[String]) -> Self {
        Self {
            success: true,
            status: SourceStatus::Partial,
            message: message.into(),
            count: Some(count),
            error: Some(failures.join("; ")),
            details: BTreeMap::new(),
        }
    }

    /// Not attempted: a required request parameter is missing.
    pub fn skipped(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            status: SourceStatus::Skipped,
            error: Some(message.clone()),
            message,
            count: None,
            details: BTreeMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            status: SourceStatus::Failed,
            message: message.into(),
            count: None,
            error: Some(error.into()),
            details: BTreeMap::new(),
        }
    }

    /// Merge the results of the connectors behind one logical source:
    /// success is the AND of all parts, counts add up, messages are joined.
    pub fn composite(parts: Vec<(String, SourceResult)>) -> Self {
        let success = parts.iter().all(|(_, r)| r.success);
        let status = if !success {
            SourceStatus::Failed
        } else if parts.iter().any(|(_, r)| r.status == SourceStatus::Partial) {
            SourceStatus::Partial
        } else {
            SourceStatus::Synced
        };
        let count = parts.iter().filter_map(|(_, r)| r.count).sum();
        let message = union_messages(&parts);
        Self {
            success,
            status,
            message,
            count: Some(count),
            error: None,
            details: parts.into_iter().collect(),
        }
    }
}

pub fn union_messages(parts: &[(String, SourceResult)]) -> String {
    parts
        .iter()
        .map(|(name, r)| format!("{name}: {}", r.message))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Terminal output of a multi-source sync.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub message: String,
    pub details: BTreeMap<String, SourceResult>,
    pub date_range: DateRange,
}

impl SyncResult {
    pub fn aggregate(parts: Vec<(String, SourceResult)>, date_range: DateRange) -> Self {
        let success = parts.iter().all(|(_, r)| r.success);
        let message = if success {
            "All requested data sources synced successfully.".to_string()
        } else {
            let failed: Vec<&str> = parts
                .iter()
                .filter(|(_, r)| !r.success)
                .map(|(name, _)| name.as_str())
                .collect();
            format!(
                "One or more data sources failed to sync: {}.",
                failed.join(", ")
            )
        };
        Self {
            success,
            message,
            details: parts.into_iter().collect(),
            date_range,
        }
    }
}

/// Answer to the `status` pseudo-source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub success: bool,
    pub status: &'static str,
    pub version: &'static str,
    pub available_sources: Vec<&'static str>,
    pub pseudo_sources: Vec<&'static str>,
    pub default_lookback_days: u32,
    pub timestamp: DateTime<Utc>,
}

/// Answer to the `auth_test` pseudo-source. Never carries the token itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTestReport {
    pub success: bool,
    pub scopes: Vec<String>,
    pub client_email: String,
    pub token_present: bool,
    pub token_length: usize,
    pub token_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SyncResponse {
    Status(StatusReport),
    AuthTest(AuthTestReport),
    Sync(SyncResult),
}

impl SyncResponse {
    pub fn success(&self) -> bool {
        match self {
            SyncResponse::Status(s) => s.success,
            SyncResponse::AuthTest(a) => a.success,
            SyncResponse::Sync(r) => r.success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_ands_success_and_sums_counts() {
        let ok = SourceResult::composite(vec![
            ("channel-analytics".to_string(), SourceResult::synced(2, "2 rows")),
            ("page-behavior".to_string(), SourceResult::synced(3, "3 rows")),
        ]);
        assert!(ok.success);
        assert_eq!(ok.status, SourceStatus::Synced);
        assert_eq!(ok.count, Some(5));
        assert_eq!(ok.message, "channel-analytics: 2 rows | page-behavior: 3 rows");

        let mixed = SourceResult::composite(vec![
            ("channel-analytics".to_string(), SourceResult::synced(2, "2 rows")),
            ("page-behavior".to_string(), SourceResult::failed("boom", "boom")),
        ]);
        assert!(!mixed.success);
        assert_eq!(mixed.status, SourceStatus::Failed);
        assert_eq!(mixed.count, Some(2));
    }

    #[test]
    fn request_body_accepts_legacy_keys() {
        let body: SyncRequestBody = serde_json::from_str(
            r#"{"type":"clarity","clarityProjectId":"abc","scope":"analytics"}"#,
        )
        .unwrap();
        assert_eq!(body.sync_type.as_deref(), Some("clarity"));
        assert_eq!(body.project_id.as_deref(), Some("abc"));
        assert!(matches!(body.scope, Some(ScopeParam::One(_))));
    }

    #[test]
    fn date_range_serializes_as_iso_dates() {
        let range = DateRange {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        };
        assert_eq!(
            serde_json::to_value(range).unwrap(),
            serde_json::json!({ "startDate": "2024-01-01", "endDate": "2024-01-02" })
        );
    }
}

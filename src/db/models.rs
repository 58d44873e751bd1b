use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column value as written to / read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Real(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Text(v.format("%Y-%m-%d").to_string())
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Text(v.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One record ready for the writer: ordered `(column, value)` pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub columns: Vec<(&'static str, SqlValue)>,
}

impl Row {
    pub fn with(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.columns.push((column, value.into()));
        self
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(c, _)| *c).collect()
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }
}

/// A row read back from the store, keyed by column name.
pub type StoredRow = BTreeMap<String, SqlValue>;

/// A normalized record bound to one destination table.
///
/// `CONFLICT_KEYS` is the natural key: it must match the table's UNIQUE
/// constraint, and an upsert on it replaces every other column.
pub trait NormalizedRecord {
    const TABLE: &'static str;
    const CONFLICT_KEYS: &'static [&'static str];

    fn into_row(self) -> Row;
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub order_id: i64,
    pub order_data: String,
    pub synced_at: DateTime<Utc>,
}

impl NormalizedRecord for OrderRecord {
    const TABLE: &'static str = "raw_woocommerce_orders";
    const CONFLICT_KEYS: &'static [&'static str] = &["order_id"];

    fn into_row(self) -> Row {
        Row::default()
            .with("order_id", self.order_id)
            .with("order_data", self.order_data)
            .with("synced_at", self.synced_at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    pub date: NaiveDate,
    pub source: String,
    pub medium: String,
    pub campaign: String,
    pub sessions: i64,
    pub total_users: i64,
    pub new_users: i64,
    pub conversions: i64,
    pub synced_at: DateTime<Utc>,
}

impl NormalizedRecord for ChannelRecord {
    const TABLE: &'static str = "raw_ga4_data";
    const CONFLICT_KEYS: &'static [&'static str] = &["date", "source", "medium", "campaign"];

    fn into_row(self) -> Row {
        Row::default()
            .with("date", self.date)
            .with("source", self.source)
            .with("medium", self.medium)
            .with("campaign", self.campaign)
            .with("sessions", self.sessions)
            .with("total_users", self.total_users)
            .with("new_users", self.new_users)
            .with("conversions", self.conversions)
            .with("synced_at", self.synced_at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageBehaviorRecord {
    pub date: NaiveDate,
    pub page_path: String,
    pub device_category: String,
    pub sessions: i64,
    pub engaged_sessions: i64,
    pub average_session_duration: f64,
    pub conversions: f64,
    pub synced_at: DateTime<Utc>,
}

impl NormalizedRecord for PageBehaviorRecord {
    const TABLE: &'static str = "raw_ga4_page_behavior";
    const CONFLICT_KEYS: &'static [&'static str] = &["date", "page_path", "device_category"];

    fn into_row(self) -> Row {
        Row::default()
            .with("date", self.date)
            .with("page_path", self.page_path)
            .with("device_category", self.device_category)
            .with("sessions", self.sessions)
            .with("engaged_sessions", self.engaged_sessions)
            .with("average_session_duration", self.average_session_duration)
            .with("conversions", self.conversions)
            .with("synced_at", self.synced_at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConsoleRecord {
    pub date: NaiveDate,
    /// Empty when the row came from the page-dimension query.
    pub query: String,
    /// Empty when the row came from the query-dimension query.
    pub page: String,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
    pub synced_at: DateTime<Utc>,
}

impl NormalizedRecord for SearchConsoleRecord {
    const TABLE: &'static str = "raw_gsc_data";
    const CONFLICT_KEYS: &'static [&'static str] = &["date", "page", "query"];

    fn into_row(self) -> Row {
        Row::default()
            .with("date", self.date)
            .with("query", self.query)
            .with("page", self.page)
            .with("clicks", self.clicks)
            .with("impressions", self.impressions)
            .with("ctr", self.ctr)
            .with("position", self.position)
            .with("synced_at", self.synced_at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSpeedRecord {
    pub report_date: NaiveDate,
    pub page_url: String,
    pub strategy: String,
    pub performance_score: Option<f64>,
    pub first_contentful_paint_ms: Option<f64>,
    pub largest_contentful_paint_ms: Option<f64>,
    pub cumulative_layout_shift: Option<f64>,
    pub total_blocking_time_ms: Option<f64>,
    pub speed_index_ms: Option<f64>,
    pub synced_at: DateTime<Utc>,
}

impl NormalizedRecord for PageSpeedRecord {
    const TABLE: &'static str = "pagespeed_reports";
    const CONFLICT_KEYS: &'static [&'static str] = &["report_date", "page_url", "strategy"];

    fn into_row(self) -> Row {
        Row::default()
            .with("report_date", self.report_date)
            .with("page_url", self.page_url)
            .with("strategy", self.strategy)
            .with("performance_score", self.performance_score)
            .with("first_contentful_paint_ms", self.first_contentful_paint_ms)
            .with("largest_contentful_paint_ms", self.largest_contentful_paint_ms)
            .with("cumulative_layout_shift", self.cumulative_layout_shift)
            .with("total_blocking_time_ms", self.total_blocking_time_ms)
            .with("speed_index_ms", self.speed_index_ms)
            .with("synced_at", self.synced_at)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionMetricRecord {
    pub metric_date: NaiveDate,
    pub page_url: String,
    pub dead_clicks: Option<i64>,
    pub rage_clicks: Option<i64>,
    pub excessive_scrolling: Option<i64>,
    pub average_scroll_depth_percent: Option<f64>,
    pub synced_at: DateTime<Utc>,
}

impl NormalizedRecord for SessionMetricRecord {
    const TABLE: &'static str = "clarity_metrics";
    const CONFLICT_KEYS: &'static [&'static str] = &["metric_date", "page_url"];

    fn into_row(self) -> Row {
        Row::default()
            .with("metric_date", self.metric_date)
            .with("page_url", self.page_url)
            .with("dead_clicks", self.dead_clicks)
            .with("rage_clicks", self.rage_clicks)
            .with("excessive_scrolling", self.excessive_scrolling)
            .with("average_scroll_depth_percent", self.average_scroll_depth_percent)
            .with("synced_at", self.synced_at)
    }
}

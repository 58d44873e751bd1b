//! Raw provider rows -> normalized records.
//!
//! Everything here is pure: dates are parsed, numeric strings coerced and
//! natural keys assembled, with the sync timestamp supplied by the caller.

use crate::db::models::{
    ChannelRecord, OrderRecord, PageBehaviorRecord, PageSpeedRecord, SearchConsoleRecord,
    SessionMetricRecord,
};
use crate::error::SyncError;
use crate::types::clarity::ClarityMetric;
use crate::types::ga4::{ReportRow, RunReportResponse};
use crate::types::pagespeed::{PageSpeedResponse, Strategy};
use crate::types::search_console::{SearchAnalyticsRow, SearchDimension};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashSet;

/// Accepts GA4's compact `YYYYMMDD` as well as ISO `YYYY-MM-DD`.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

/// Integer metric from its string form. Fractional values truncate; blank is zero.
pub fn coerce_i64(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

pub fn coerce_f64(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn json_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn json_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => coerce_i64(s),
        _ => None,
    }
}

/// Synthetic merge key for Search Console rows: `{date}|query:{term}` or `{date}|page:{path}`.
pub fn search_console_key(date: &str, dimension: SearchDimension, value: &str) -> String {
    format!("{date}|{}:{value}", dimension.as_str())
}

fn bad(source_name: &'static str, reason: impl Into<String>) -> SyncError {
    SyncError::Transform {
        source_name,
        reason: reason.into(),
    }
}

pub fn orders_to_records(
    orders: Vec<Value>,
    synced_at: DateTime<Utc>,
) -> Result<Vec<OrderRecord>, SyncError> {
    orders
        .into_iter()
        .map(|order| {
            let order_id = json_i64(order.get("id"))
                .ok_or_else(|| bad("WooCommerce", "order without a numeric `id`"))?;
            Ok(OrderRecord {
                order_id,
                order_data: order.to_string(),
                synced_at,
            })
        })
        .collect()
}

fn dimension<'a>(row: &'a ReportRow, idx: usize, name: &str) -> Result<&'a str, SyncError> {
    row.dimension(idx)
        .ok_or_else(|| bad("GA4", format!("row is missing dimension `{name}`")))
}

fn report_date(row: &ReportRow) -> Result<NaiveDate, SyncError> {
    let raw = dimension(row, 0, "date")?;
    parse_report_date(raw).ok_or_else(|| bad("GA4", format!("unparseable date `{raw}`")))
}

fn int_metric(row: &ReportRow, idx: usize, name: &str) -> Result<i64, SyncError> {
    let raw = row.metric(idx).unwrap_or_default();
    coerce_i64(raw).ok_or_else(|| bad("GA4", format!("metric `{name}` is not numeric: `{raw}`")))
}

fn float_metric(row: &ReportRow, idx: usize, name: &str) -> Result<f64, SyncError> {
    let raw = row.metric(idx).unwrap_or_default();
    coerce_f64(raw).ok_or_else(|| bad("GA4", format!("metric `{name}` is not numeric: `{raw}`")))
}

/// Rows ordered as `CHANNEL_DIMENSIONS` / `CHANNEL_METRICS`.
pub fn channel_rows_to_records(
    report: RunReportResponse,
    synced_at: DateTime<Utc>,
) -> Result<Vec<ChannelRecord>, SyncError> {
    report
        .rows
        .iter()
        .map(|row| {
            Ok(ChannelRecord {
                date: report_date(row)?,
                source: dimension(row, 1, "sessionSource")?.to_string(),
                medium: dimension(row, 2, "sessionMedium")?.to_string(),
                campaign: dimension(row, 3, "sessionCampaignName")?.to_string(),
                sessions: int_metric(row, 0, "sessions")?,
                total_users: int_metric(row, 1, "totalUsers")?,
                new_users: int_metric(row, 2, "newUsers")?,
                conversions: int_metric(row, 3, "conversions")?,
                synced_at,
            })
        })
        .collect()
}

/// Rows ordered as `PAGE_BEHAVIOR_DIMENSIONS` / `PAGE_BEHAVIOR_METRICS`.
pub fn page_behavior_rows_to_records(
    report: RunReportResponse,
    synced_at: DateTime<Utc>,
) -> Result<Vec<PageBehaviorRecord>, SyncError> {
    report
        .rows
        .iter()
        .map(|row| {
            Ok(PageBehaviorRecord {
                date: report_date(row)?,
                page_path: dimension(row, 1, "pagePath")?.to_string(),
                device_category: dimension(row, 2, "deviceCategory")?.to_string(),
                sessions: int_metric(row, 0, "sessions")?,
                engaged_sessions: int_metric(row, 1, "engagedSessions")?,
                average_session_duration: float_metric(row, 2, "averageSessionDuration")?,
                conversions: float_metric(row, 3, "conversions")?,
                synced_at,
            })
        })
        .collect()
}

/// Merge the by-query and by-page result sets into one deduplicated list.
///
/// The API cannot return both dimensions jointly, so each row is keyed by
/// date plus whichever dimension produced it. Query rows are taken first;
/// on a repeated key the first row seen is kept.
pub fn merge_search_console(
    query_rows: Vec<SearchAnalyticsRow>,
    page_rows: Vec<SearchAnalyticsRow>,
    synced_at: DateTime<Utc>,
) -> Result<Vec<SearchConsoleRecord>, SyncError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(query_rows.len() + page_rows.len());

    let tagged = query_rows
        .into_iter()
        .map(|r| (SearchDimension::Query, r))
        .chain(page_rows.into_iter().map(|r| (SearchDimension::Page, r)));

    for (dim, row) in tagged {
        let (Some(date_raw), Some(value)) = (row.keys.first(), row.keys.get(1)) else {
            return Err(bad(
                "Search Console",
                format!("row keys {:?} do not match [date, {}]", row.keys, dim.as_str()),
            ));
        };
        let date = parse_report_date(date_raw)
            .ok_or_else(|| bad("Search Console", format!("unparseable date `{date_raw}`")))?;
        if !seen.insert(search_console_key(date_raw, dim, value)) {
            continue;
        }
        let (query, page) = match dim {
            SearchDimension::Query => (value.clone(), String::new()),
            SearchDimension::Page => (String::new(), value.clone()),
        };
        merged.push(SearchConsoleRecord {
            date,
            query,
            page,
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
            synced_at,
        });
    }
    Ok(merged)
}

/// `None` when the run produced no Lighthouse result (nothing to store).
pub fn pagespeed_to_record(
    page_url: &str,
    strategy: Strategy,
    response: PageSpeedResponse,
    report_date: NaiveDate,
    synced_at: DateTime<Utc>,
) -> Option<PageSpeedRecord> {
    let lh = response.lighthouse_result?;
    Some(PageSpeedRecord {
        report_date,
        page_url: page_url.to_string(),
        strategy: strategy.as_str().to_string(),
        performance_score: lh.category_score("performance"),
        first_contentful_paint_ms: lh.audit_value("first-contentful-paint"),
        largest_contentful_paint_ms: lh.audit_value("largest-contentful-paint"),
        cumulative_layout_shift: lh.audit_value("cumulative-layout-shift"),
        total_blocking_time_ms: lh.audit_value("total-blocking-time"),
        speed_index_ms: lh.audit_value("speed-index"),
        synced_at,
    })
}

/// Rows without their own date are stamped with `fallback_date` (the range end).
pub fn clarity_to_records(
    metrics: Vec<ClarityMetric>,
    fallback_date: NaiveDate,
    synced_at: DateTime<Utc>,
) -> Result<Vec<SessionMetricRecord>, SyncError> {
    metrics
        .into_iter()
        .map(|m| {
            let metric_date = match m.date.as_deref() {
                Some(raw) => parse_report_date(raw)
                    .ok_or_else(|| bad("Clarity", format!("unparseable date `{raw}`")))?,
                None => fallback_date,
            };
            Ok(SessionMetricRecord {
                metric_date,
                page_url: m.page,
                dead_clicks: json_i64(m.dead_clicks.as_ref()),
                rage_clicks: json_i64(m.rage_clicks.as_ref()),
                excessive_scrolling: json_i64(m.excessive_scrolling.as_ref()),
                average_scroll_depth_percent: json_f64(m.average_scroll_depth.as_ref()),
                synced_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn gsc_row(date: &str, key: &str, clicks: f64) -> SearchAnalyticsRow {
        serde_json::from_value(json!({
            "keys": [date, key], "clicks": clicks, "impressions": 100.0, "ctr": 0.1, "position": 3.5
        }))
        .unwrap()
    }

    fn ga4_report(rows: serde_json::Value) -> RunReportResponse {
        serde_json::from_value(json!({ "rows": rows })).unwrap()
    }

    #[test]
    fn compact_and_iso_dates_parse() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_report_date("20240309"), Some(expected));
        assert_eq!(parse_report_date("2024-03-09"), Some(expected));
        assert_eq!(parse_report_date("2024039"), None);
        assert_eq!(parse_report_date("20241399"), None);
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(coerce_i64("42"), Some(42));
        assert_eq!(coerce_i64("3.9"), Some(3));
        assert_eq!(coerce_i64(""), Some(0));
        assert_eq!(coerce_i64("n/a"), None);
        assert_eq!(coerce_f64("61.25"), Some(61.25));
        assert_eq!(coerce_f64("NaN"), None);
    }

    #[test]
    fn page_behavior_dates_are_reformatted() {
        let report = ga4_report(json!([{
            "dimensionValues": [{"value": "20240101"}, {"value": "/pricing"}, {"value": "mobile"}],
            "metricValues": [{"value": "120"}, {"value": "80"}, {"value": "61.5"}, {"value": "4"}]
        }]));
        let records = page_behavior_rows_to_records(report, now()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(r.page_path, "/pricing");
        assert_eq!(r.device_category, "mobile");
        assert_eq!(r.sessions, 120);
        assert_eq!(r.engaged_sessions, 80);
        assert_eq!(r.average_session_duration, 61.5);
        assert_eq!(r.conversions, 4.0);
    }

    #[test]
    fn channel_row_with_missing_dimension_is_rejected() {
        let report = ga4_report(json!([{
            "dimensionValues": [{"value": "20240101"}, {"value": "google"}],
            "metricValues": [{"value": "1"}, {"value": "1"}, {"value": "1"}, {"value": "1"}]
        }]));
        let err = channel_rows_to_records(report, now()).unwrap_err();
        assert!(err.to_string().contains("sessionMedium"));
    }

    #[test]
    fn search_console_merge_is_union_of_unique_keys() {
        // Two days, overlapping term/path text, and a duplicate query row.
        let queries = vec![
            gsc_row("2024-01-01", "rust", 5.0),
            gsc_row("2024-01-01", "tokio", 2.0),
            gsc_row("2024-01-02", "rust", 7.0),
            gsc_row("2024-01-01", "rust", 99.0),
        ];
        let pages = vec![
            gsc_row("2024-01-01", "/blog", 4.0),
            gsc_row("2024-01-01", "rust", 1.0),
            gsc_row("2024-01-02", "/blog", 6.0),
        ];

        let merged = merge_search_console(queries, pages, now()).unwrap();
        // 3 distinct query keys + 3 distinct page keys; not 3 x 3.
        assert_eq!(merged.len(), 6);

        let first_rust = merged
            .iter()
            .find(|r| r.query == "rust" && r.date == NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .unwrap();
        assert_eq!(first_rust.clicks, 5.0, "first-seen row wins");
        assert!(first_rust.page.is_empty());

        let page_rust = merged.iter().find(|r| r.page == "rust").unwrap();
        assert!(page_rust.query.is_empty());
    }

    #[test]
    fn synthetic_key_format() {
        assert_eq!(
            search_console_key("2024-01-01", SearchDimension::Query, "shoes"),
            "2024-01-01|query:shoes"
        );
        assert_eq!(
            search_console_key("2024-01-01", SearchDimension::Page, "/shoes"),
            "2024-01-01|page:/shoes"
        );
    }

    #[test]
    fn pagespeed_without_lighthouse_is_skipped() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let empty = PageSpeedResponse::default();
        assert!(pagespeed_to_record("https://a.example/", Strategy::Mobile, empty, date, now()).is_none());

        let full: PageSpeedResponse = serde_json::from_value(json!({
            "lighthouseResult": {
                "categories": { "performance": { "score": 0.87 } },
                "audits": {
                    "first-contentful-paint": { "numericValue": 1200.5 },
                    "speed-index": { "numericValue": 2100.0 }
                }
            }
        }))
        .unwrap();
        let rec = pagespeed_to_record("https://a.example/", Strategy::Desktop, full, date, now()).unwrap();
        assert_eq!(rec.strategy, "desktop");
        assert_eq!(rec.performance_score, Some(0.87));
        assert_eq!(rec.first_contentful_paint_ms, Some(1200.5));
        assert_eq!(rec.largest_contentful_paint_ms, None);
    }

    #[test]
    fn orders_keep_full_document() {
        let records = orders_to_records(
            vec![json!({"id": 101, "total": "19.90"}), json!({"id": "102"})],
            now(),
        )
        .unwrap();
        assert_eq!(records[0].order_id, 101);
        assert!(records[0].order_data.contains("19.90"));
        assert_eq!(records[1].order_id, 102);
        assert!(orders_to_records(vec![json!({"number": "x"})], now()).is_err());
    }

    #[test]
    fn clarity_rows_fall_back_to_range_end() {
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let metrics: Vec<ClarityMetric> = serde_json::from_value(json!([
            { "page": "https://a.example/", "dead_clicks": 3, "rage_clicks": "2", "average_scroll_depth": 54.5 },
            { "url": "https://a.example/b", "date": "2024-01-15", "excessiveScrolling": 1 }
        ]))
        .unwrap();
        let records = clarity_to_records(metrics, end, now()).unwrap();
        assert_eq!(records[0].metric_date, end);
        assert_eq!(records[0].dead_clicks, Some(3));
        assert_eq!(records[0].rage_clicks, Some(2));
        assert_eq!(records[0].average_scroll_depth_percent, Some(54.5));
        assert_eq!(records[1].metric_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(records[1].excessive_scrolling, Some(1));
    }
}

//! SQL DDL for the destination tables.
//! SQLite-first; the UNIQUE constraints are the upsert conflict targets.

/// Every table carries:
/// - `id` INTEGER PRIMARY KEY AUTOINCREMENT
/// - a UNIQUE constraint over its natural key (must match `NormalizedRecord::CONFLICT_KEYS`)
/// - `synced_at` TEXT (RFC3339) stamped by the writer
///
/// Dates are stored as `YYYY-MM-DD` text.
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS raw_woocommerce_orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER NOT NULL,
    order_data TEXT NOT NULL, -- full order document, JSON
    synced_at TEXT NOT NULL,
    UNIQUE (order_id)
);

CREATE TABLE IF NOT EXISTS raw_ga4_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    source TEXT NOT NULL,
    medium TEXT NOT NULL,
    campaign TEXT NOT NULL,
    sessions INTEGER NOT NULL DEFAULT 0,
    total_users INTEGER NOT NULL DEFAULT 0,
    new_users INTEGER NOT NULL DEFAULT 0,
    conversions INTEGER NOT NULL DEFAULT 0,
    synced_at TEXT NOT NULL,
    UNIQUE (date, source, medium, campaign)
);

CREATE TABLE IF NOT EXISTS raw_ga4_page_behavior (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    page_path TEXT NOT NULL,
    device_category TEXT NOT NULL,
    sessions INTEGER NOT NULL DEFAULT 0,
    engaged_sessions INTEGER NOT NULL DEFAULT 0,
    average_session_duration REAL NOT NULL DEFAULT 0,
    conversions REAL NOT NULL DEFAULT 0,
    synced_at TEXT NOT NULL,
    UNIQUE (date, page_path, device_category)
);

-- `query`/`page` hold '' for the dimension a row was not fetched by,
-- so the conflict key never contains NULL.
CREATE TABLE IF NOT EXISTS raw_gsc_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,
    query TEXT NOT NULL DEFAULT '',
    page TEXT NOT NULL DEFAULT '',
    clicks REAL NOT NULL DEFAULT 0,
    impressions REAL NOT NULL DEFAULT 0,
    ctr REAL NOT NULL DEFAULT 0,
    position REAL NOT NULL DEFAULT 0,
    synced_at TEXT NOT NULL,
    UNIQUE (date, page, query)
);

CREATE TABLE IF NOT EXISTS pagespeed_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_date TEXT NOT NULL,
    page_url TEXT NOT NULL,
    strategy TEXT NOT NULL,
    performance_score REAL NULL,
    first_contentful_paint_ms REAL NULL,
    largest_contentful_paint_ms REAL NULL,
    cumulative_layout_shift REAL NULL,
    total_blocking_time_ms REAL NULL,
    speed_index_ms REAL NULL,
    synced_at TEXT NOT NULL,
    UNIQUE (report_date, page_url, strategy)
);

CREATE TABLE IF NOT EXISTS clarity_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    metric_date TEXT NOT NULL,
    page_url TEXT NOT NULL,
    dead_clicks INTEGER NULL,
    rage_clicks INTEGER NULL,
    excessive_scrolling INTEGER NULL,
    average_scroll_depth_percent REAL NULL,
    synced_at TEXT NOT NULL,
    UNIQUE (metric_date, page_url)
);
"#;

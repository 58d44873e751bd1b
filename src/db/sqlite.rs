use crate::db::models::{Row, SqlValue, StoredRow};
use crate::db::schema::SQLITE_INIT;
use crate::db::store::RecordStore;
use crate::error::SyncError;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Column, Pool, Row as _, Sqlite, TypeInfo, ValueRef};
use std::str::FromStr;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and bootstrap the tables.
    pub async fn connect(database_url: &str) -> Result<Self, SyncError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_opts = SqlitePoolOptions::new();
        if database_url.contains(":memory:") {
            // Each in-memory connection is its own database; pin exactly one.
            pool_opts = pool_opts
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_opts.connect_with(connect_opts).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), SyncError> {
        // execute multiple statements one by one (sqlx::query runs a single statement)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    /// Uses SQLite `INSERT ... ON CONFLICT(keys) DO UPDATE` inside one transaction.
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        conflict_keys: &[&str],
    ) -> Result<usize, SyncError> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };
        let columns = first.column_names();
        let sql = build_upsert_sql(table, &columns, conflict_keys)?;

        let mut tx = self.pool.begin().await?;
        let mut written = 0usize;
        for row in rows {
            if row.column_names() != columns {
                return Err(SyncError::SourceWrite {
                    table: "(dynamic)",
                    reason: format!("row columns differ from first row in {table}"),
                });
            }
            let mut query = sqlx::query(&sql);
            for (_, value) in row.columns {
                query = match value {
                    SqlValue::Null => query.bind(None::<String>),
                    SqlValue::Integer(i) => query.bind(i),
                    SqlValue::Real(f) => query.bind(f),
                    SqlValue::Text(s) => query.bind(s),
                };
            }
            query.execute(&mut *tx).await?;
            written += 1;
        }
        tx.commit().await?;
        Ok(written)
    }

    async fn select(&self, table: &str) -> Result<Vec<StoredRow>, SyncError> {
        check_identifier(table)?;
        let rows = sqlx::query(&format!("SELECT * FROM {table} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut stored = StoredRow::new();
            for (idx, column) in row.columns().iter().enumerate() {
                let (is_null, type_name) = {
                    let raw = row.try_get_raw(idx)?;
                    (raw.is_null(), raw.type_info().name().to_string())
                };
                let value = if is_null {
                    SqlValue::Null
                } else {
                    match type_name.as_str() {
                        "INTEGER" => SqlValue::Integer(row.try_get(idx)?),
                        "REAL" => SqlValue::Real(row.try_get(idx)?),
                        "BLOB" => {
                            let bytes: Vec<u8> = row.try_get(idx)?;
                            SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                        }
                        _ => SqlValue::Text(row.try_get(idx)?),
                    }
                };
                stored.insert(column.name().to_string(), value);
            }
            out.push(stored);
        }
        Ok(out)
    }
}

fn check_identifier(ident: &str) -> Result<(), SyncError> {
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !ident.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(SyncError::SourceWrite {
            table: "(dynamic)",
            reason: format!("illegal identifier `{ident}`"),
        })
    }
}

fn build_upsert_sql(
    table: &str,
    columns: &[&str],
    conflict_keys: &[&str],
) -> Result<String, SyncError> {
    check_identifier(table)?;
    for ident in columns.iter().chain(conflict_keys) {
        check_identifier(ident)?;
    }
    if conflict_keys.is_empty() || !conflict_keys.iter().all(|k| columns.contains(k)) {
        return Err(SyncError::SourceWrite {
            table: "(dynamic)",
            reason: format!("conflict keys of {table} must be a non-empty subset of its columns"),
        });
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !conflict_keys.contains(c))
        .map(|c| format!("{c}=excluded.{c}"))
        .collect();
    let on_conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT({}) {on_conflict}",
        columns.join(", "),
        conflict_keys.join(", "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{ChannelRecord, NormalizedRecord, SearchConsoleRecord};
    use crate::db::store::upsert_records;
    use chrono::{NaiveDate, TimeZone, Utc};

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:").await.unwrap()
    }

    fn channel(source: &str, sessions: i64) -> ChannelRecord {
        ChannelRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            source: source.to_string(),
            medium: "organic".to_string(),
            campaign: "(not set)".to_string(),
            sessions,
            total_users: sessions - 1,
            new_users: 3,
            conversions: 1,
            synced_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap(),
        }
    }

    #[test]
    fn upsert_sql_updates_every_non_key_column() {
        let sql = build_upsert_sql("t", &["a", "b", "c"], &["a"]).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO t (a, b, c) VALUES (?, ?, ?) ON CONFLICT(a) DO UPDATE SET b=excluded.b, c=excluded.c"
        );
        assert!(build_upsert_sql("t; DROP TABLE x", &["a"], &["a"]).is_err());
        assert!(build_upsert_sql("t", &["a"], &["z"]).is_err());
    }

    #[tokio::test]
    async fn applying_the_same_records_twice_is_idempotent() {
        let store = memory_store().await;
        let records = vec![channel("google", 10), channel("bing", 4)];

        assert_eq!(upsert_records(&store, records.clone()).await.unwrap(), 2);
        let once = store.select(ChannelRecord::TABLE).await.unwrap();

        assert_eq!(upsert_records(&store, records).await.unwrap(), 2);
        let twice = store.select(ChannelRecord::TABLE).await.unwrap();

        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn conflict_replaces_measures_last_write_wins() {
        let store = memory_store().await;
        upsert_records(&store, vec![channel("google", 10)]).await.unwrap();
        upsert_records(&store, vec![channel("google", 25)]).await.unwrap();

        let rows = store.select(ChannelRecord::TABLE).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["sessions"], SqlValue::Integer(25));
        assert_eq!(rows[0]["total_users"], SqlValue::Integer(24));
        assert_eq!(rows[0]["date"], SqlValue::Text("2024-01-01".to_string()));
    }

    #[tokio::test]
    async fn empty_dimension_still_conflicts() {
        let store = memory_store().await;
        let record = SearchConsoleRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            query: "rust crates".to_string(),
            page: String::new(),
            clicks: 3.0,
            impressions: 40.0,
            ctr: 0.075,
            position: 4.2,
            synced_at: Utc::now(),
        };
        upsert_records(&store, vec![record.clone()]).await.unwrap();
        upsert_records(&store, vec![record]).await.unwrap();
        assert_eq!(store.select("raw_gsc_data").await.unwrap().len(), 1);
    }
}

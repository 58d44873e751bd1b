use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use super::models::{NormalizedRecord, Row, StoredRow};
use crate::error::SyncError;

/// Store client consumed by the pipelines.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert `rows` into `table`, replacing every non-key column of rows
    /// whose `conflict_keys` already exist. Returns the number of rows written.
    async fn upsert(
        &self,
        table: &str,
        rows: Vec<Row>,
        conflict_keys: &[&str],
    ) -> Result<usize, SyncError>;

    /// All rows of `table` in insertion order.
    async fn select(&self, table: &str) -> Result<Vec<StoredRow>, SyncError>;
}

/// Collapse rows sharing a natural key, keeping the first position and the
/// last values. Mirrors what the conflict clause leaves in the table.
pub fn dedupe_by_key(rows: Vec<Row>, conflict_keys: &[&str]) -> Vec<Row> {
    let mut position: HashMap<String, usize> = HashMap::with_capacity(rows.len());
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        let fingerprint = {
            let key: Vec<_> = conflict_keys.iter().map(|k| row.get(k)).collect();
            format!("{key:?}")
        };
        if let Some(&idx) = position.get(&fingerprint) {
            out[idx] = row;
        } else {
            position.insert(fingerprint, out.len());
            out.push(row);
        }
    }
    out
}

/// Typed front door for [`RecordStore::upsert`]; failures become `SourceWrite`.
///
/// The returned count is the number of distinct natural keys written.
pub async fn upsert_records<R: NormalizedRecord>(
    store: &dyn RecordStore,
    records: Vec<R>,
) -> Result<usize, SyncError> {
    if records.is_empty() {
        return Ok(0);
    }
    let received = records.len();
    let rows = dedupe_by_key(
        records.into_iter().map(NormalizedRecord::into_row).collect(),
        R::CONFLICT_KEYS,
    );
    debug!(
        table = R::TABLE,
        rows = rows.len(),
        collapsed = received - rows.len(),
        "upserting records"
    );
    store
        .upsert(R::TABLE, rows, R::CONFLICT_KEYS)
        .await
        .map_err(|e| match e {
            SyncError::SourceWrite { .. } => e,
            other => SyncError::SourceWrite {
                table: R::TABLE,
                reason: other.to_string(),
            },
        })
}

//! Database module: normalized records, schema and the upsert writer.
//!
//! Layout:
//! - `models.rs`: record structs per destination table and the `Row` they lower to
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `store.rs`: the `RecordStore` client trait the pipelines write through
//! - `sqlite.rs`: sqlx-backed `RecordStore`

pub mod models;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use models::{NormalizedRecord, Row, SqlValue, StoredRow};
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, SqliteStore};
pub use store::{RecordStore, upsert_records};

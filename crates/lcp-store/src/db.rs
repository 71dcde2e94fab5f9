//! Database connection pool and schema management.
//!
//! The status store runs on SQLite. `DATABASE_URL`-style connection strings
//! such as `sqlite://lcp.db` or `sqlite::memory:` are accepted. The schema
//! is applied by the embedded migrations on every start.

use std::str::FromStr;
use std::time::Duration;

use lcp_core::Timestamp;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::StoreError;

/// Open a connection pool and bring the schema up to date.
///
/// Transitions read and then write inside one transaction, and SQLite
/// admits a single writer, so the pool holds one connection. An in-memory
/// database lives only as long as that connection, so it is never recycled.
pub async fn init_pool(url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30));
    if url.contains(":memory:") {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;

    run_migrations(&pool).await?;
    tracing::info!("Connected to status database and applied migrations");
    Ok(pool)
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ─── Column helpers ──────────────────────────────────────────────────

/// Timestamps are stored as RFC 3339 UTC text.
pub(crate) fn timestamp_column(ts: Option<Timestamp>) -> Option<String> {
    ts.map(|t| t.to_iso8601())
}

pub(crate) fn parse_timestamp(text: &str) -> Result<Timestamp, StoreError> {
    Timestamp::parse_lenient(text).map_err(StoreError::decode)
}

pub(crate) fn parse_optional_timestamp(
    text: Option<String>,
) -> Result<Option<Timestamp>, StoreError> {
    text.as_deref().map(parse_timestamp).transpose()
}

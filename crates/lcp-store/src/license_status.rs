//! License status persistence.
//!
//! All functions take any SQLite executor, so they run equally on the pool
//! or inside a transaction (`&mut *tx`). The status column holds the
//! one-hot integer from [`lcp_state::codec`]. A value that does not decode
//! is read back as `status: None` and logged, never raised as an error.

use futures::stream::{BoxStream, StreamExt};
use lcp_state::{codec, LicenseStatus, PotentialRights, StateError, Updated};
use sqlx::sqlite::SqliteExecutor;

use crate::db::{parse_optional_timestamp, timestamp_column};
use crate::error::StoreError;

/// Insert a new status row and return its id.
pub async fn add<'e, E>(executor: E, status: &LicenseStatus) -> Result<i64, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let bits = encoded(status)?;
    let result = sqlx::query(
        "INSERT INTO license_status (status, license_updated, status_updated, device_count,
         potential_rights_end, license_ref)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(bits)
    .bind(timestamp_column(status.updated.license))
    .bind(timestamp_column(status.updated.status))
    .bind(status.device_count)
    .bind(timestamp_column(status.potential_end()))
    .bind(&status.license_ref)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Write back the mutable columns of an existing row.
pub async fn update<'e, E>(executor: E, status: &LicenseStatus) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    let bits = encoded(status)?;
    let result = sqlx::query(
        "UPDATE license_status SET status = ?, license_updated = ?, status_updated = ?,
         device_count = ?, potential_rights_end = ? WHERE id = ?",
    )
    .bind(bits)
    .bind(timestamp_column(status.updated.license))
    .bind(timestamp_column(status.updated.status))
    .bind(status.device_count)
    .bind(timestamp_column(status.potential_end()))
    .bind(status.id)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("license status {}", status.id)));
    }
    Ok(())
}

/// Fetch a status by internal id.
pub async fn get<'e, E>(executor: E, id: i64) -> Result<LicenseStatus, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT id, status, license_updated, status_updated, device_count,
         potential_rights_end, license_ref FROM license_status WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("license status {id}")))?;
    row.into_status()
}

/// Fetch the status of a license by its external reference.
pub async fn get_by_license_ref<'e, E>(
    executor: E,
    license_ref: &str,
) -> Result<LicenseStatus, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT id, status, license_updated, status_updated, device_count,
         potential_rights_end, license_ref FROM license_status WHERE license_ref = ?",
    )
    .bind(license_ref)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("license {license_ref}")))?;
    row.into_status()
}

/// Stream every status in insertion order.
///
/// The stream is forward-only. It ends with `None` once exhausted; a failed
/// row yields `Some(Err(_))`.
pub fn list<'e, E>(executor: E) -> BoxStream<'e, Result<LicenseStatus, StoreError>>
where
    E: SqliteExecutor<'e> + 'e,
{
    sqlx::query_as::<_, StatusRow>(
        "SELECT id, status, license_updated, status_updated, device_count,
         potential_rights_end, license_ref FROM license_status ORDER BY id",
    )
    .fetch(executor)
    .map(|row| row.map_err(StoreError::from).and_then(StatusRow::into_status))
    .boxed()
}

fn encoded(status: &LicenseStatus) -> Result<i64, StoreError> {
    let s = status.status.ok_or_else(|| StateError::UndecodableStatus {
        license_ref: status.license_ref.clone(),
    })?;
    Ok(codec::encode(s))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct StatusRow {
    id: i64,
    status: i64,
    license_updated: Option<String>,
    status_updated: Option<String>,
    device_count: i64,
    potential_rights_end: Option<String>,
    license_ref: String,
}

impl StatusRow {
    fn into_status(self) -> Result<LicenseStatus, StoreError> {
        let status = codec::decode(self.status);
        if status.is_none() {
            tracing::warn!(
                license_ref = %self.license_ref,
                bits = self.status,
                "stored license status does not decode to a single state"
            );
        }
        let potential_end = parse_optional_timestamp(self.potential_rights_end)?;
        Ok(LicenseStatus {
            id: self.id,
            license_ref: self.license_ref,
            status,
            updated: Updated {
                license: parse_optional_timestamp(self.license_updated)?,
                status: parse_optional_timestamp(self.status_updated)?,
            },
            message: String::new(),
            links: Vec::new(),
            device_count: self.device_count,
            potential_rights: potential_end.map(|end| PotentialRights { end: Some(end) }),
            events: Vec::new(),
        })
    }
}

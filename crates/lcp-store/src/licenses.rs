//! License document persistence.
//!
//! Issued licenses are stored whole, as their JSON document, keyed by
//! license id. The signature is part of the stored document.

use lcp_core::LicenseId;
use lcp_license::License;
use sqlx::sqlite::SqliteExecutor;

use crate::db::timestamp_column;
use crate::error::StoreError;

/// Store a newly issued license.
pub async fn add<'e, E>(executor: E, license: &License) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    let document = serde_json::to_string(license).map_err(StoreError::decode)?;
    sqlx::query("INSERT INTO license (id, issued, updated, document) VALUES (?, ?, ?, ?)")
        .bind(license.id().to_string())
        .bind(license.date().to_iso8601())
        .bind(timestamp_column(license.updated))
        .bind(document)
        .execute(executor)
        .await?;
    Ok(())
}

/// Replace the stored document of an existing license.
pub async fn update<'e, E>(executor: E, license: &License) -> Result<(), StoreError>
where
    E: SqliteExecutor<'e>,
{
    let document = serde_json::to_string(license).map_err(StoreError::decode)?;
    let result = sqlx::query("UPDATE license SET updated = ?, document = ? WHERE id = ?")
        .bind(timestamp_column(license.updated))
        .bind(document)
        .bind(license.id().to_string())
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(format!("license {}", license.id())));
    }
    Ok(())
}

/// Fetch a license by id.
pub async fn get<'e, E>(executor: E, id: LicenseId) -> Result<License, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let document: String = sqlx::query_scalar("SELECT document FROM license WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("license {id}")))?;
    serde_json::from_str(&document).map_err(StoreError::decode)
}

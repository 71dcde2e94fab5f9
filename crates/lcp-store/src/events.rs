//! Event log persistence.
//!
//! The `event` table is append-only: this module has no update or delete
//! operation, and the schema installs triggers that abort any `UPDATE` or
//! `DELETE` on it. Insertion order (ascending id) is the log order.

use futures::stream::{BoxStream, StreamExt};
use lcp_state::{Event, EventType, NewEvent};
use sqlx::sqlite::SqliteExecutor;

use crate::db::parse_timestamp;
use crate::error::StoreError;

/// Append an event and return it with its assigned id.
pub async fn add<'e, E>(executor: E, event: &NewEvent) -> Result<Event, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT INTO event (device_name, timestamp, type, device_id, license_status_fk)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&event.device_name)
    .bind(event.timestamp.to_iso8601())
    .bind(event.event_type.code())
    .bind(&event.device_id)
    .bind(event.status_id)
    .execute(executor)
    .await?;

    Ok(Event {
        id: result.last_insert_rowid(),
        device_name: event.device_name.clone(),
        timestamp: event.timestamp,
        event_type: event.event_type,
        device_id: event.device_id.clone(),
        status_id: event.status_id,
    })
}

/// Fetch an event by id.
pub async fn get<'e, E>(executor: E, id: i64) -> Result<Event, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, EventRow>(
        "SELECT id, device_name, timestamp, type, device_id, license_status_fk
         FROM event WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("event {id}")))?;
    row.into_event()
}

/// Stream the whole log in insertion order.
pub fn list<'e, E>(executor: E) -> BoxStream<'e, Result<Event, StoreError>>
where
    E: SqliteExecutor<'e> + 'e,
{
    sqlx::query_as::<_, EventRow>(
        "SELECT id, device_name, timestamp, type, device_id, license_status_fk
         FROM event ORDER BY id",
    )
    .fetch(executor)
    .map(|row| row.map_err(StoreError::from).and_then(EventRow::into_event))
    .boxed()
}

/// Stream the events of one license status in insertion order.
pub fn list_by_owner<'e, E>(
    executor: E,
    status_id: i64,
) -> BoxStream<'e, Result<Event, StoreError>>
where
    E: SqliteExecutor<'e> + 'e,
{
    sqlx::query_as::<_, EventRow>(
        "SELECT id, device_name, timestamp, type, device_id, license_status_fk
         FROM event WHERE license_status_fk = ? ORDER BY id",
    )
    .bind(status_id)
    .fetch(executor)
    .map(|row| row.map_err(StoreError::from).and_then(EventRow::into_event))
    .boxed()
}

/// Type of the most recent event a device recorded on a license, if any.
pub async fn latest_device_event<'e, E>(
    executor: E,
    status_id: i64,
    device_id: &str,
) -> Result<Option<EventType>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let code: Option<i64> = sqlx::query_scalar(
        "SELECT type FROM event WHERE license_status_fk = ? AND device_id = ?
         ORDER BY id DESC LIMIT 1",
    )
    .bind(status_id)
    .bind(device_id)
    .fetch_optional(executor)
    .await?;

    code.map(|c| {
        EventType::from_code(c).ok_or_else(|| StoreError::decode(UnknownEventType(c)))
    })
    .transpose()
}

/// Register events of a license, one per registered device, oldest first.
pub async fn registered_devices<'e, E>(
    executor: E,
    status_id: i64,
) -> Result<Vec<Event>, StoreError>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, EventRow>(
        "SELECT id, device_name, timestamp, type, device_id, license_status_fk
         FROM event WHERE license_status_fk = ? AND type = ? ORDER BY id",
    )
    .bind(status_id)
    .bind(EventType::Register.code())
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(EventRow::into_event).collect()
}

#[derive(Debug, thiserror::Error)]
#[error("unknown event type code {0}")]
struct UnknownEventType(i64);

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct EventRow {
    id: i64,
    device_name: String,
    timestamp: String,
    #[sqlx(rename = "type")]
    event_type: i64,
    device_id: String,
    license_status_fk: i64,
}

impl EventRow {
    fn into_event(self) -> Result<Event, StoreError> {
        let event_type = EventType::from_code(self.event_type)
            .ok_or_else(|| StoreError::decode(UnknownEventType(self.event_type)))?;
        Ok(Event {
            id: self.id,
            device_name: self.device_name,
            timestamp: parse_timestamp(&self.timestamp)?,
            event_type,
            device_id: self.device_id,
            status_id: self.license_status_fk,
        })
    }
}

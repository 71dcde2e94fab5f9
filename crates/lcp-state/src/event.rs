//! # Device Events
//!
//! Every device transition appends one [`Event`] to the license's audit log.
//! Events are immutable once written.

use lcp_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Maximum byte length of a device id or name.
pub const MAX_DEVICE_FIELD_LEN: usize = 255;

/// Audit category of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Register,
    Return,
    Renew,
}

impl EventType {
    /// Persisted integer code.
    pub fn code(&self) -> i64 {
        match self {
            Self::Register => 1,
            Self::Return => 2,
            Self::Renew => 3,
        }
    }

    /// Inverse of [`EventType::code`].
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Register),
            2 => Some(Self::Return),
            3 => Some(Self::Renew),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Register => "register",
            Self::Return => "return",
            Self::Renew => "renew",
        };
        f.write_str(s)
    }
}

/// A client device identified by id and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    id: String,
    name: String,
}

impl Device {
    /// Both fields are mandatory and at most 255 bytes.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, StateError> {
        let id = id.into();
        let name = name.into();
        for (field, value) in [("id", &id), ("name", &name)] {
            if value.is_empty() || value.len() > MAX_DEVICE_FIELD_LEN {
                return Err(StateError::InvalidDevice(format!(
                    "device {field} must be 1 to {MAX_DEVICE_FIELD_LEN} bytes, got {}",
                    value.len()
                )));
            }
        }
        Ok(Self { id, name })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An event not yet written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub device_name: String,
    pub device_id: String,
    pub timestamp: Timestamp,
    pub event_type: EventType,
    /// Internal id of the owning license status.
    pub status_id: i64,
}

impl NewEvent {
    pub fn new(
        event_type: EventType,
        device: &Device,
        status_id: i64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            device_name: device.name().to_string(),
            device_id: device.id().to_string(),
            timestamp,
            event_type,
            status_id,
        }
    }
}

/// A persisted event.
///
/// Serializes in the status document shape: `{name, timestamp, type, id}`
/// where `id` is the device id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "name")]
    pub device_name: String,
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(rename = "id")]
    pub device_id: String,
    #[serde(skip)]
    pub status_id: i64,
}

//! # License Identifier
//!
//! `LicenseId` wraps a random (version 4, RFC 4122 variant) UUID. It is
//! generated once when a license is prepared and never changes afterwards.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LcpError;

/// Unique identifier of a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(Uuid);

impl LicenseId {
    /// Generate a new random license identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for LicenseId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for LicenseId {
    type Err = LcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| LcpError::Validation(format!("invalid license id {s:?}: {e}")))
    }
}

impl std::fmt::Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

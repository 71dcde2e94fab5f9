//! The license status enum.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a license as seen by devices.
///
/// Declaration order fixes each variant's bit index in the persisted
/// one-hot encoding (see [`crate::codec`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Issued, no device registered yet.
    Ready,
    /// At least one device registered.
    Active,
    /// Withdrawn by the provider (terminal).
    Revoked,
    /// Returned by the user (terminal).
    Returned,
    /// Withdrawn before first use (terminal).
    Cancelled,
    /// Rights window elapsed (terminal).
    Expired,
}

impl Status {
    /// All statuses in bit-index order.
    pub const ALL: [Status; 6] = [
        Status::Ready,
        Status::Active,
        Status::Revoked,
        Status::Returned,
        Status::Cancelled,
        Status::Expired,
    ];

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Revoked | Self::Returned | Self::Cancelled | Self::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Human-readable message carried in the status document.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Ready => "The license is ready to be used on a device.",
            Self::Active => "The license is active.",
            Self::Revoked => "The license has been revoked by the provider.",
            Self::Returned => "The license has been returned.",
            Self::Cancelled => "The license has been cancelled before use.",
            Self::Expired => "The license has expired.",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown license status {s:?}"))
    }
}

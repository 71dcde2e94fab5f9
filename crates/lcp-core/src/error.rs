//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types shared by every crate in the workspace. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Taxonomy
//!
//! - `NotFound`: a lookup by identifier matched nothing.
//! - `Validation`: caller input violates a documented constraint.
//! - `Integrity`: stored or received data failed a consistency check
//!   (bad signature, ambiguous status bitmask, digest mismatch).
//! - `Io`: storage or transport failure.
//! - `Config`: configuration missing or malformed. Fatal at startup.
//!
//! Component crates define their own narrower enums and convert into
//! these categories at the boundary.

use thiserror::Error;

/// Top-level error type for the license core.
#[derive(Error, Debug)]
pub enum LcpError {
    /// Lookup by identifier found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller input rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// Content integrity violation.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization or parsing failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

//! # Canonical Serialization
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! that are hashed or signed anywhere in the workspace.
//!
//! ## Algorithm
//!
//! 1. Serialize the value to a generic JSON tree (`serde_json::Value`).
//! 2. Re-read every object into a string-keyed map ordered by key. This
//!    discards the declaration order of struct fields and the insertion
//!    order of maps.
//! 3. Re-serialize in JCS form (RFC 8785) via `serde_jcs`: sorted keys,
//!    compact separators, no HTML escaping, no trailing newline.
//!
//! The result is a pure function of the value's observable JSON structure,
//! and it is idempotent: decoding canonical bytes and canonicalizing again
//! reproduces the same bytes. Signature verification depends on both.
//!
//! ## Security Invariant
//!
//! The inner `Vec<u8>` is private. Signing, verification and digest
//! functions accept `&CanonicalBytes`, so a non-canonical serialization can
//! never reach them.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by canonical serialization.
///
/// # Invariants
///
/// - The only constructors are [`CanonicalBytes::new()`] and
///   [`CanonicalBytes::from_json_slice()`].
/// - Object keys are sorted lexicographically at every nesting level.
/// - Separators are compact and no trailing whitespace is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON (e.g. a map with non-string keys).
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let ordered = reorder(value);
        let s = serde_jcs::to_string(&ordered)?;
        Ok(Self(s.into_bytes()))
    }

    /// Canonicalize an already-serialized JSON document.
    ///
    /// Used when the input arrives as bytes (a license read back from
    /// storage, or a file passed to the CLI).
    pub fn from_json_slice(json: &[u8]) -> Result<Self, CanonicalizationError> {
        let value: Value = serde_json::from_slice(json)?;
        Self::new(&value)
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume and return the inner bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A JSON tree whose objects are ordered by key.
///
/// `serde_json::Map` may preserve insertion order when another crate in the
/// build enables `preserve_order`; a `BTreeMap` never does.
#[derive(Serialize)]
#[serde(untagged)]
enum Ordered {
    Leaf(Value),
    Array(Vec<Ordered>),
    Object(BTreeMap<String, Ordered>),
}

fn reorder(value: Value) -> Ordered {
    match value {
        Value::Object(map) => {
            Ordered::Object(map.into_iter().map(|(k, v)| (k, reorder(v))).collect())
        }
        Value::Array(arr) => Ordered::Array(arr.into_iter().map(reorder).collect()),
        leaf => Ordered::Leaf(leaf),
    }
}

//! # lcp-core: Foundational Types for the License Core
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! primitives every other crate relies on to keep license documents
//! verifiable and tamper-evident.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every signature and digest in the
//!    workspace is computed over `CanonicalBytes`. No raw
//!    `serde_json::to_vec()` output is ever signed. Two structurally equal
//!    licenses always produce the same bytes.
//!
//! 2. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that every hash input went through canonicalization.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with a `Z` suffix and
//!    seconds precision, so the same instant always canonicalizes the same way.
//!
//! 4. **`LicenseId` is a random v4 UUID.** Generated once, never mutated.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `lcp-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod bytes;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, sha256_hex_of, sha256_reader, ContentDigest};
pub use error::{CanonicalizationError, LcpError};
pub use identity::LicenseId;
pub use temporal::Timestamp;

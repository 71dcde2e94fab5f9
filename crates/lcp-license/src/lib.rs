//! # lcp-license: License Documents
//!
//! A license grants one user access to one protected publication. It embeds
//! the publication's content key, wrapped under the user's passphrase, and
//! is signed by the provider over its canonical bytes.
//!
//! ## Lifecycle
//!
//! 1. A caller fills a [`LicenseDraft`] (user, rights, links, profile).
//! 2. [`LicenseDraft::prepare`] (or [`License::new`]) assigns the id and
//!    issue date. These are fixed from then on.
//! 3. [`Issuer::issue`] wraps the content key, builds the key check,
//!    encrypts listed user fields and signs.
//! 4. [`verify_license`] recomputes the canonical bytes without the
//!    signature and checks it. Documents read from outside go through
//!    [`verify_license_document`], which canonicalizes the received bytes.

pub mod builder;
pub mod error;
pub mod issue;
pub mod model;

pub use builder::{LicenseDraft, DEFAULT_HINT};
pub use error::LicenseError;
pub use issue::{
    verify_license, verify_license_certificate, verify_license_document,
    verify_license_document_certificate, Issuer,
};
pub use model::{ContentKeyInfo, Encryption, License, Link, Rights, UserInfo, UserKeyInfo};

//! # lcp-state: License Status State Machine
//!
//! Tracks what a client device may do with an issued license.
//!
//! ## States
//!
//! ```text
//! Ready ──register──▶ Active ──renew──▶ Active
//!   │                   │
//!   │                   ├──return──▶ Returned (terminal)
//!   │                   ├──revoke──▶ Revoked  (terminal)
//!   │                   └──expire──▶ Expired  (terminal)
//!   │
//!   ├──return / cancel──▶ Cancelled (terminal)
//!   ├──revoke──────────▶ Revoked   (terminal)
//!   └──expire──────────▶ Expired   (terminal)
//! ```
//!
//! Device transitions (register, renew, return) produce exactly one
//! [`NewEvent`] for the append-only log. Administrative transitions
//! (revoke, cancel, expire) change the status only.
//!
//! This crate is pure: it mutates in-memory records and reports the event
//! to append. Persistence and atomicity live in `lcp-store`.

pub mod codec;
pub mod document;
pub mod error;
pub mod event;
pub mod machine;
pub mod status;

pub use document::{
    LicenseStatus, LinkSettings, PotentialRights, StatusLink, StatusPolicy, Updated,
    LICENSE_MEDIA_TYPE, STATUS_MEDIA_TYPE,
};
pub use error::StateError;
pub use event::{Device, Event, EventType, NewEvent};
pub use machine::{RegisterOutcome, RenewRequest};
pub use status::Status;

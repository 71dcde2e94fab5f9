//! # lcp-store: Persistence for the License Core
//!
//! SQLite persistence of license statuses, their append-only event log and
//! issued license documents, plus the object storage that hosts encrypted
//! publications.
//!
//! ## Modules
//!
//! - [`db`]: pool setup and embedded migrations.
//! - [`license_status`], [`events`], [`licenses`]: table-level operations,
//!   generic over any SQLite executor so they compose inside transactions.
//! - [`locks`]: per-license async mutex registry.
//! - [`service`]: [`StatusService`], which runs every status transition
//!   under its license lock and inside one SQL transaction.
//! - [`storage`]: [`ObjectStore`] with filesystem and no-op backends.

pub mod db;
pub mod error;
pub mod events;
pub mod license_status;
pub mod licenses;
pub mod locks;
pub mod service;
pub mod storage;

pub use db::{init_pool, run_migrations};
pub use error::StoreError;
pub use locks::{LicenseGuard, LicenseLocks};
pub use service::{StatusService, StatusSettings};
pub use storage::{
    open_object_store, FsStore, Item, NoStore, ObjectStore, StorageConfig, StorageMode,
};

//! # lcp-cli: Operator Command-Line Interface
//!
//! The `lcp` binary drives the license core from a shell.
//!
//! ## Subcommands
//!
//! - `lcp encrypt`: Encrypt publication packages, optionally storing them.
//! - `lcp canonicalize`: Print the canonical form (or digest) of a JSON document.
//! - `lcp sign`: Sign a license with the configured provider key.
//! - `lcp verify`: Verify a license signature.
//! - `lcp status`: Create, inspect and transition license statuses.
//! - `lcp compliance`: Notify the status server of compliance test progress.
//!
//! ## Crate Policy
//!
//! - Argument parsing lives next to each handler; `main.rs` only dispatches.
//! - Handlers delegate to the domain crates and return an exit code.
//! - Configuration is loaded once and passed down explicitly.

pub mod compliance;
pub mod config;
pub mod encrypt;
pub mod license;
pub mod logging;
pub mod status;

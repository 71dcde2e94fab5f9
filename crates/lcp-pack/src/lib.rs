//! # lcp-pack: Publication Encryption Pipeline
//!
//! Encrypts the resources of a zip-based publication under one content key.
//! `mimetype`, `META-INF/*` and a root `manifest.json` are copied in clear.
//! EPUB packages get a `META-INF/encryption.xml` declaring the encrypted
//! resources ([`encryption`]).
//! Packages are processed synchronously; run independent packages on
//! blocking threads to process them in parallel.

pub mod encryption;
pub mod error;
pub mod pipeline;

pub use encryption::{CONTAINER_XML, ENCRYPTION_XML};
pub use error::PipelineError;
pub use pipeline::{
    encrypt_package, is_encryptable, process, EncryptedResource, EncryptionArtifact,
};

use lcp_core::CanonicalizationError;
use lcp_crypto::CryptoError;
use thiserror::Error;

/// Errors raised while issuing or verifying a license.
#[derive(Error, Debug)]
pub enum LicenseError {
    /// Key wrapping, encryption or signing failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The license could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// The document is not JSON, or does not have the license shape.
    #[error("malformed license document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The license carries no signature.
    #[error("license {0} is not signed")]
    Unsigned(String),

    /// Caller-supplied license content is unusable.
    #[error("invalid license: {0}")]
    Validation(String),
}

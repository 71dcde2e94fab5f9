//! Errors raised by signing, key handling and encryption.

use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The private key is of a kind the signer does not handle (EC, DSA,
    /// encrypted PKCS#8, unknown PEM label).
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Key material could not be decoded.
    #[error("key error: {0}")]
    KeyError(String),

    /// Certificate could not be decoded or carries an unusable public key.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// The encryption profile has no key derivation available here.
    #[error("unsupported encryption profile: {0}")]
    UnsupportedProfile(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong length, bad padding).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Reading or writing a resource stream failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

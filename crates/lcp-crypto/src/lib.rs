//! # lcp-crypto: Cryptographic Primitives
//!
//! Building blocks for issuing protected licenses:
//!
//! - **License signatures**: RSA PKCS#1 v1.5 over the SHA-256 digest of
//!   `CanonicalBytes`, with the provider's X.509 certificate attached.
//! - **Key wrapping**: the content key encrypted under a key derived from
//!   the user's passphrase (SHA-256), plus the key check and user field
//!   encryption that ride along in the license.
//! - **Resource cipher**: AES-256-CBC applied to each publication resource.
//!
//! ## Crate Policy
//!
//! - Depends only on `lcp-core` internally.
//! - Private key material never implements `Serialize` and is redacted in
//!   `Debug` output.
//! - Tests use real keys from `tests/fixtures/`, never mocks.

pub mod cipher;
pub mod error;
pub mod keywrap;
pub mod sign;

pub use cipher::{publication_resource_cipher, Aes256CbcCipher, ResourceCipher};
pub use error::CryptoError;
pub use keywrap::{
    build_key_check, decrypt_field, encrypt_field, unwrap_content_key, validate_profile,
    verify_key_check, wrap_content_key, ContentKey, UserKey, BASIC_PROFILE,
    CONTENT_KEY_ALGORITHM, DEFAULT_PROFILE, USER_KEY_ALGORITHM,
};
pub use rsa::RsaPublicKey;
pub use sign::{
    public_key_from_certificate, verify, verify_with_certificate, LicenseSigner, Signature,
    RSA_SHA256_ALGORITHM,
};

//! # Key Wrapping
//!
//! The 32-byte content key of a publication is delivered inside the license,
//! encrypted under a key-encrypting key (KEK) derived from the user's
//! passphrase. Only the basic profile's derivation (KEK = SHA-256 of the
//! passphrase) is available here.
//!
//! ## Layout
//!
//! Wrapped content key: `IV (16 bytes) || AES-256-CBC(content key)`, no
//! padding, 48 bytes total. Key check and encrypted user fields use the same
//! IV prefix with PKCS#7 padding.
//!
//! The wrapped key carries no integrity tag. Unwrapping with the wrong
//! passphrase yields different bytes, which the key check detects.

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Profile whose user key is the plain SHA-256 of the passphrase.
pub const BASIC_PROFILE: &str = "http://readium.org/lcp/basic-profile";

/// Profile assigned to new licenses when the caller gives none.
pub const DEFAULT_PROFILE: &str = "http://readium.org/lcp/profile-1.0";

/// Content key encryption algorithm URI.
pub const CONTENT_KEY_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";

/// User key derivation algorithm URI.
pub const USER_KEY_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

const IV_LEN: usize = 16;

/// Length of a wrapped content key.
pub const WRAPPED_KEY_LEN: usize = IV_LEN + 32;

/// A 32-byte symmetric key protecting one publication.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    /// Fresh random key from the OS RNG.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentKey(<redacted>)")
    }
}

/// The key-encrypting key derived from a user passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct UserKey([u8; 32]);

impl UserKey {
    /// KEK = SHA-256(passphrase).
    pub fn from_passphrase(passphrase: &str) -> Self {
        let hash = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&hash);
        Self(key)
    }

    /// Accept an already-hashed passphrase given as 64 hex characters.
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| CryptoError::KeyError(format!("invalid hex user key: {e}")))?;
        let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::KeyError(format!("user key must be 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserKey(<redacted>)")
    }
}

/// Return the user key only when `profile` is one whose derivation is
/// available here. Any other profile yields `None`.
pub fn validate_profile(user_key: &UserKey, profile: &str) -> Option<UserKey> {
    if profile == BASIC_PROFILE {
        Some(user_key.clone())
    } else {
        None
    }
}

/// Encrypt the content key under the user key.
pub fn wrap_content_key(
    content_key: &ContentKey,
    user_key: &UserKey,
) -> Result<Vec<u8>, CryptoError> {
    let iv = random_iv();
    let enc = Aes256CbcEnc::new_from_slices(user_key.as_bytes(), &iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let body = enc.encrypt_padded_vec_mut::<NoPadding>(content_key.as_bytes());
    let mut out = Vec::with_capacity(WRAPPED_KEY_LEN);
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Inverse of [`wrap_content_key`].
pub fn unwrap_content_key(wrapped: &[u8], user_key: &UserKey) -> Result<ContentKey, CryptoError> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::Decryption(format!(
            "wrapped content key must be {WRAPPED_KEY_LEN} bytes, got {}",
            wrapped.len()
        )));
    }
    let (iv, body) = wrapped.split_at(IV_LEN);
    let dec = Aes256CbcDec::new_from_slices(user_key.as_bytes(), iv)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    let plain = dec
        .decrypt_padded_vec_mut::<NoPadding>(body)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    let key: [u8; 32] = plain
        .try_into()
        .map_err(|_| CryptoError::Decryption("unwrapped key has wrong length".to_string()))?;
    Ok(ContentKey(key))
}

/// Encrypt an arbitrary field under the user key (IV prefix, PKCS#7).
pub fn encrypt_field(plaintext: &[u8], user_key: &UserKey) -> Result<Vec<u8>, CryptoError> {
    let iv = random_iv();
    let enc = Aes256CbcEnc::new_from_slices(user_key.as_bytes(), &iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let body = enc.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + body.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Inverse of [`encrypt_field`].
pub fn decrypt_field(ciphertext: &[u8], user_key: &UserKey) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < 2 * IV_LEN || ciphertext.len() % IV_LEN != 0 {
        return Err(CryptoError::Decryption(format!(
            "ciphertext length {} is not IV plus whole blocks",
            ciphertext.len()
        )));
    }
    let (iv, body) = ciphertext.split_at(IV_LEN);
    let dec = Aes256CbcDec::new_from_slices(user_key.as_bytes(), iv)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    dec.decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|e| CryptoError::Decryption(e.to_string()))
}

/// Key check: the license id encrypted under the user key. A reading system
/// decrypts it to confirm the passphrase before unwrapping the content key.
pub fn build_key_check(license_id: &str, user_key: &UserKey) -> Result<Vec<u8>, CryptoError> {
    encrypt_field(license_id.as_bytes(), user_key)
}

/// True when `key_check` decrypts to `license_id` under `user_key`.
pub fn verify_key_check(key_check: &[u8], license_id: &str, user_key: &UserKey) -> bool {
    matches!(decrypt_field(key_check, user_key), Ok(plain) if plain == license_id.as_bytes())
}

fn random_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn wrap_roundtrip_any_key(key in any::<[u8; 32]>(), pass in ".{0,40}") {
            let ck = ContentKey::from_bytes(key);
            let uk = UserKey::from_passphrase(&pass);
            let wrapped = wrap_content_key(&ck, &uk).unwrap();
            prop_assert_eq!(unwrap_content_key(&wrapped, &uk).unwrap(), ck);
        }
    }
}

//! # Content Digest
//!
//! SHA-256 digests over canonical license bytes and over opaque content
//! (packaged publications, resources).
//!
//! ## Security Invariant
//!
//! [`sha256_digest()`] accepts only `&CanonicalBytes`, so every digest that
//! feeds a signature went through canonicalization. Opaque content that is
//! never signed as a document (zip archives, resource streams) goes through
//! [`sha256_hex_of()`] or [`sha256_reader()`] instead.

use std::io::Read;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// A raw 32-byte SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Access the digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

fn finish(hasher: Sha256) -> ContentDigest {
    let hash = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Compute a SHA-256 digest from canonical bytes.
///
/// This is the digest that license signatures are computed over.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    finish(hasher)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// Hex SHA-256 of opaque content.
pub fn sha256_hex_of(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    finish(hasher).to_hex()
}

/// Stream a reader through SHA-256, returning the digest and the number of
/// bytes consumed.
pub fn sha256_reader(mut reader: impl Read) -> std::io::Result<(ContentDigest, u64)> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((finish(hasher), total))
}

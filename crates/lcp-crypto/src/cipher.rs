//! # Resource Cipher
//!
//! Encrypts publication resources under the content key. Each call draws a
//! fresh IV, so no cipher state is shared between two resources.
//!
//! Output layout: `IV (16 bytes) || AES-256-CBC(plaintext, PKCS#7)`.

use std::io::{Read, Write};

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;
use crate::keywrap::{ContentKey, CONTENT_KEY_ALGORITHM};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// A symmetric cipher applied to individual publication resources.
pub trait ResourceCipher: Send + Sync {
    /// Algorithm URI written into the encryption metadata.
    fn algorithm(&self) -> &'static str;

    /// Encrypt everything from `input` into `output`. Returns the number of
    /// bytes written.
    fn encrypt(
        &self,
        key: &ContentKey,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<u64, CryptoError>;

    /// Decrypt everything from `input` into `output`. Returns the number of
    /// plaintext bytes written.
    fn decrypt(
        &self,
        key: &ContentKey,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<u64, CryptoError>;
}

/// AES-256-CBC with a random IV prefix and PKCS#7 padding.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256CbcCipher;

impl ResourceCipher for Aes256CbcCipher {
    fn algorithm(&self) -> &'static str {
        CONTENT_KEY_ALGORITHM
    }

    fn encrypt(
        &self,
        key: &ContentKey,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<u64, CryptoError> {
        let mut plain = Vec::new();
        input.read_to_end(&mut plain)?;

        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut iv);
        let enc = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let body = enc.encrypt_padded_vec_mut::<Pkcs7>(&plain);

        output.write_all(&iv)?;
        output.write_all(&body)?;
        Ok((iv.len() + body.len()) as u64)
    }

    fn decrypt(
        &self,
        key: &ContentKey,
        input: &mut dyn Read,
        output: &mut dyn Write,
    ) -> Result<u64, CryptoError> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        if data.len() < 32 || data.len() % 16 != 0 {
            return Err(CryptoError::Decryption(format!(
                "encrypted resource length {} is not IV plus whole blocks",
                data.len()
            )));
        }
        let (iv, body) = data.split_at(16);
        let dec = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        let plain = dec
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        output.write_all(&plain)?;
        Ok(plain.len() as u64)
    }
}

/// The cipher used for the resources of a packaged publication.
pub fn publication_resource_cipher() -> Box<dyn ResourceCipher> {
    Box::new(Aes256CbcCipher)
}

//! # License Signatures: RSA PKCS#1 v1.5 with SHA-256
//!
//! A license is signed by the content provider. The signature covers the
//! SHA-256 digest of the license's canonical bytes and travels with the
//! provider's leaf certificate so that reading systems can verify it.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`. Raw serializer output never
//!   reaches the signer, so two structurally equal licenses always sign the
//!   same bytes.
//! - PKCS#1 v1.5 signing is deterministic: the same key and canonical input
//!   always produce the same signature value.
//! - `LicenseSigner` holds immutable key material only, and is `Send + Sync`.
//!
//! ## Supported keys
//!
//! RSA private keys in PKCS#1 (`RSA PRIVATE KEY`) or unencrypted PKCS#8
//! (`PRIVATE KEY`) PEM. Everything else is rejected with
//! [`CryptoError::UnsupportedKeyType`].

use lcp_core::{sha256_digest, CanonicalBytes};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, PrivateKeyInfo};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x509_cert::der::{Decode, Encode};

use crate::error::CryptoError;

/// Algorithm URI recorded in every signature produced here.
pub const RSA_SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// A detached license signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// DER bytes of the signer's leaf certificate.
    #[serde(with = "lcp_core::bytes::base64")]
    pub certificate: Vec<u8>,
    /// Raw signature value.
    #[serde(with = "lcp_core::bytes::base64")]
    pub value: Vec<u8>,
    /// Signature algorithm URI.
    pub algorithm: String,
}

/// Signs canonical license bytes with the provider's RSA key.
pub struct LicenseSigner {
    key: RsaPrivateKey,
    certificate_der: Vec<u8>,
}

impl LicenseSigner {
    /// Build a signer from a PEM certificate (chain) and a PEM private key.
    ///
    /// Only the first certificate of the chain is kept. Its DER bytes are
    /// attached verbatim to every signature.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, CryptoError> {
        let certificate_der = first_certificate_der(cert_pem)?;
        let key = decode_private_key(key_pem)?;

        // The certificate must describe the same key we sign with.
        let cert_key = public_key_from_certificate(&certificate_der)?;
        if cert_key != key.to_public_key() {
            return Err(CryptoError::KeyError(
                "private key does not match certificate public key".to_string(),
            ));
        }

        tracing::debug!(cert_len = certificate_der.len(), "loaded license signer");
        Ok(Self {
            key,
            certificate_der,
        })
    }

    /// DER bytes of the leaf certificate.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The public half of the signing key.
    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Result<Signature, CryptoError> {
        let digest = sha256_digest(data);
        let value = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha256>(), digest.as_bytes())
            .map_err(|e| CryptoError::KeyError(format!("RSA signing failed: {e}")))?;
        Ok(Signature {
            certificate: self.certificate_der.clone(),
            value,
            algorithm: RSA_SHA256_ALGORITHM.to_string(),
        })
    }
}

impl std::fmt::Debug for LicenseSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LicenseSigner(<private>)")
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a signature over canonical bytes with an explicit public key.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Signature,
    public_key: &RsaPublicKey,
) -> Result<(), CryptoError> {
    if signature.algorithm != RSA_SHA256_ALGORITHM {
        return Err(CryptoError::VerificationFailed(format!(
            "unexpected signature algorithm {:?}",
            signature.algorithm
        )));
    }
    let digest = sha256_digest(data);
    public_key
        .verify(
            Pkcs1v15Sign::new::<Sha256>(),
            digest.as_bytes(),
            &signature.value,
        )
        .map_err(|e| CryptoError::VerificationFailed(format!("RSA verification failed: {e}")))
}

/// Verify a signature against the public key of the certificate it carries.
///
/// This checks integrity only. Whether the certificate is trusted is the
/// caller's decision.
pub fn verify_with_certificate(
    data: &CanonicalBytes,
    signature: &Signature,
) -> Result<(), CryptoError> {
    let public_key = public_key_from_certificate(&signature.certificate)?;
    verify(data, signature, &public_key)
}

/// Extract the RSA public key from a DER certificate.
pub fn public_key_from_certificate(der: &[u8]) -> Result<RsaPublicKey, CryptoError> {
    let cert = x509_cert::Certificate::from_der(der)
        .map_err(|e| CryptoError::Certificate(format!("invalid DER certificate: {e}")))?;
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| CryptoError::Certificate(format!("cannot encode public key info: {e}")))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| CryptoError::Certificate(format!("certificate key is not RSA: {e}")))
}

// ---------------------------------------------------------------------------
// PEM decoding
// ---------------------------------------------------------------------------

const PEM_END: &str = "-----END ";

fn first_certificate_der(pem: &str) -> Result<Vec<u8>, CryptoError> {
    let block = first_pem_block(pem)
        .ok_or_else(|| CryptoError::Certificate("no PEM block found".to_string()))?;
    let (label, der) = pem_rfc7468::decode_vec(block.as_bytes())
        .map_err(|e| CryptoError::Certificate(format!("invalid PEM: {e}")))?;
    if label != "CERTIFICATE" {
        return Err(CryptoError::Certificate(format!(
            "expected CERTIFICATE, found {label}"
        )));
    }
    x509_cert::Certificate::from_der(&der)
        .map_err(|e| CryptoError::Certificate(format!("invalid DER certificate: {e}")))?;
    Ok(der)
}

fn decode_private_key(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    let block = first_pem_block(pem)
        .ok_or_else(|| CryptoError::KeyError("no PEM block found".to_string()))?;
    let (label, der) = pem_rfc7468::decode_vec(block.as_bytes())
        .map_err(|e| CryptoError::KeyError(format!("invalid PEM: {e}")))?;

    match label {
        "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(&der)
            .map_err(|e| CryptoError::KeyError(format!("invalid PKCS#1 RSA key: {e}"))),
        "PRIVATE KEY" => {
            let info = PrivateKeyInfo::try_from(der.as_slice())
                .map_err(|e| CryptoError::KeyError(format!("invalid PKCS#8 key: {e}")))?;
            if info.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
                return Err(CryptoError::UnsupportedKeyType(format!(
                    "PKCS#8 key algorithm {}",
                    info.algorithm.oid
                )));
            }
            RsaPrivateKey::from_pkcs8_der(&der)
                .map_err(|e| CryptoError::KeyError(format!("invalid PKCS#8 RSA key: {e}")))
        }
        other => Err(CryptoError::UnsupportedKeyType(other.to_string())),
    }
}

/// Slice out the first `-----BEGIN ...-----` / `-----END ...-----` block.
fn first_pem_block(pem: &str) -> Option<&str> {
    let start = pem.find("-----BEGIN ")?;
    let rest = &pem[start..];
    let end_marker = rest.find(PEM_END)?;
    let tail = &rest[end_marker + PEM_END.len()..];
    let close = tail.find("-----")?;
    let end = end_marker + PEM_END.len() + close + "-----".len();
    Some(&rest[..end])
}

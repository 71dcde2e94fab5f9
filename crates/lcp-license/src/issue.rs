//! # License Issuance
//!
//! Turns a draft into a signed license bound to one user passphrase.
//!
//! ## Security Invariant
//!
//! The signature is computed over the canonical bytes of the license with
//! the `signature` field removed, and is attached last. Any change made
//! after signing, including re-ordering of object keys by a client, is
//! caught by [`verify_license`] only if it changes the canonical form.
//!
//! A document received from outside is verified as bytes, with
//! [`verify_license_document`] or [`verify_license_document_certificate`].
//! Parsing into [`License`] first would drop fields the model does not
//! know, so a signed license with injected fields would still verify.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lcp_core::CanonicalBytes;
use lcp_crypto::{
    build_key_check, encrypt_field, validate_profile, verify, verify_with_certificate,
    wrap_content_key, ContentKey, CryptoError, LicenseSigner, RsaPublicKey, Signature, UserKey,
    CONTENT_KEY_ALGORITHM, USER_KEY_ALGORITHM,
};
use serde_json::Value;

use crate::builder::{LicenseDraft, DEFAULT_HINT};
use crate::error::LicenseError;
use crate::model::{License, Link};

/// Relation name of the protected publication in `links`.
pub const PUBLICATION_REL: &str = "publication";

/// Issues signed licenses with one provider key.
#[derive(Debug)]
pub struct Issuer {
    signer: LicenseSigner,
}

impl Issuer {
    pub fn new(signer: LicenseSigner) -> Self {
        Self { signer }
    }

    pub fn signer(&self) -> &LicenseSigner {
        &self.signer
    }

    /// Prepare, protect and sign a license.
    ///
    /// Fails when the draft's profile has no user key derivation available
    /// (see [`validate_profile`]).
    pub fn issue(
        &self,
        draft: LicenseDraft,
        content_key: &ContentKey,
        user_key: &UserKey,
        publication: Link,
    ) -> Result<License, LicenseError> {
        let mut license = draft.prepare();
        let profile = license.encryption.profile.clone();
        let user_key = validate_profile(user_key, &profile)
            .ok_or_else(|| CryptoError::UnsupportedProfile(profile.clone()))?;

        license.encryption.content_key.algorithm = CONTENT_KEY_ALGORITHM.to_string();
        license.encryption.content_key.encrypted_value = wrap_content_key(content_key, &user_key)?;

        let id = license.id().to_string();
        let uk = &mut license.encryption.user_key;
        uk.algorithm = USER_KEY_ALGORITHM.to_string();
        if uk.hint.is_empty() {
            uk.hint = DEFAULT_HINT.to_string();
        }
        uk.key_check = Some(build_key_check(&id, &user_key)?);

        encrypt_user_fields(&mut license, &user_key)?;
        license
            .links
            .insert(PUBLICATION_REL.to_string(), publication);

        self.sign(&mut license)?;
        tracing::info!(license_id = %id, profile = %profile, "issued license");
        Ok(license)
    }

    /// Replace any signature on `license` with a fresh one.
    pub fn sign(&self, license: &mut License) -> Result<(), LicenseError> {
        let canonical = license.canonical_unsigned()?;
        license.signature = Some(self.signer.sign(&canonical)?);
        Ok(())
    }
}

fn encrypt_user_fields(license: &mut License, user_key: &UserKey) -> Result<(), LicenseError> {
    let names = license.user.encrypted.clone();
    for name in names {
        let slot = match name.as_str() {
            "email" => &mut license.user.email,
            "name" => &mut license.user.name,
            other => {
                return Err(LicenseError::Validation(format!(
                    "user field {other:?} cannot be encrypted"
                )))
            }
        };
        if let Some(clear) = slot.as_deref() {
            let encrypted = encrypt_field(clear.as_bytes(), user_key)?;
            *slot = Some(STANDARD.encode(encrypted));
        }
    }
    Ok(())
}

/// Verify the signature of a license held in memory against a known
/// provider key.
pub fn verify_license(license: &License, public_key: &RsaPublicKey) -> Result<(), LicenseError> {
    let signature = license
        .signature
        .as_ref()
        .ok_or_else(|| LicenseError::Unsigned(license.id().to_string()))?;
    let canonical = license.canonical_unsigned()?;
    verify(&canonical, signature, public_key)?;
    Ok(())
}

/// Verify the signature of a license held in memory against the
/// certificate it carries.
pub fn verify_license_certificate(license: &License) -> Result<(), LicenseError> {
    let signature = license
        .signature
        .as_ref()
        .ok_or_else(|| LicenseError::Unsigned(license.id().to_string()))?;
    let canonical = license.canonical_unsigned()?;
    verify_with_certificate(&canonical, signature)?;
    Ok(())
}

// ─── Received documents ──────────────────────────────────────────────

/// Verify a received license document against a known provider key and
/// return the parsed license.
///
/// The signature covers every member of the document except `signature`,
/// including members [`License`] does not model.
pub fn verify_license_document(
    json: &[u8],
    public_key: &RsaPublicKey,
) -> Result<License, LicenseError> {
    let (license, signature, canonical) = split_document(json)?;
    verify(&canonical, &signature, public_key)?;
    Ok(license)
}

/// Verify a received license document against the certificate it carries
/// and return the parsed license.
pub fn verify_license_document_certificate(json: &[u8]) -> Result<License, LicenseError> {
    let (license, signature, canonical) = split_document(json)?;
    verify_with_certificate(&canonical, &signature)?;
    Ok(license)
}

/// Parse a document and separate the signature from the canonical bytes
/// it covers.
fn split_document(json: &[u8]) -> Result<(License, Signature, CanonicalBytes), LicenseError> {
    let mut value: Value = serde_json::from_slice(json)?;
    let license: License = serde_json::from_value(value.clone())?;
    let members = value
        .as_object_mut()
        .ok_or_else(|| LicenseError::Validation("license is not a JSON object".to_string()))?;
    let signature: Signature = match members.remove("signature") {
        Some(raw) => serde_json::from_value(raw)?,
        None => return Err(LicenseError::Unsigned(license.id().to_string())),
    };
    let canonical = CanonicalBytes::new(&value)?;
    Ok((license, signature, canonical))
}

//! End-to-end issuance: draft → wrapped key → signature → verification.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lcp_crypto::{
    decrypt_field, unwrap_content_key, verify_key_check, ContentKey, CryptoError, LicenseSigner,
    UserKey, BASIC_PROFILE, DEFAULT_PROFILE,
};
use lcp_license::{
    verify_license, verify_license_certificate, verify_license_document,
    verify_license_document_certificate, Issuer, License, LicenseDraft, LicenseError, Link,
    Rights,
};

const CERT: &str = include_str!("../../lcp-crypto/tests/fixtures/cert.pem");
const KEY: &str = include_str!("../../lcp-crypto/tests/fixtures/rsa_pkcs1.pem");

fn issuer() -> Issuer {
    Issuer::new(LicenseSigner::from_pem(CERT, KEY).unwrap())
}

fn basic_draft() -> LicenseDraft {
    let mut draft = LicenseDraft::default();
    draft.encryption.profile = BASIC_PROFILE.to_string();
    draft.user.id = "user-42".to_string();
    draft.user.email = Some("reader@example.org".to_string());
    draft.user.encrypted = vec!["email".to_string()];
    draft.rights = Some(Rights {
        print: Some(10),
        copy: Some(2048),
        ..Default::default()
    });
    draft
}

fn publication() -> Link {
    Link {
        href: "https://cdn.example/books/moby-dick.epub".to_string(),
        media_type: Some("application/epub+zip".to_string()),
        size: Some(52_000),
        digest: Some(vec![0x11; 32]),
    }
}

fn issue() -> (License, ContentKey, UserKey) {
    let ck = ContentKey::generate();
    let uk = UserKey::from_passphrase("open sesame");
    let license = issuer()
        .issue(basic_draft(), &ck, &uk, publication())
        .unwrap();
    (license, ck, uk)
}

#[test]
fn issued_license_verifies() {
    let (license, _, _) = issue();
    let issuer = issuer();
    verify_license(&license, &issuer.signer().public_key()).unwrap();
    verify_license_certificate(&license).unwrap();
}

#[test]
fn issued_license_fields() {
    let (license, ck, uk) = issue();
    let enc = &license.encryption;
    assert_eq!(enc.profile, BASIC_PROFILE);
    assert_eq!(
        enc.content_key.algorithm,
        "http://www.w3.org/2001/04/xmlenc#aes256-cbc"
    );
    assert_eq!(enc.user_key.algorithm, "http://www.w3.org/2001/04/xmlenc#sha256");
    assert_eq!(enc.user_key.hint, "Enter your passphrase");
    assert_eq!(enc.content_key.encrypted_value.len(), 48);
    assert_eq!(unwrap_content_key(&enc.content_key.encrypted_value, &uk).unwrap(), ck);

    let check = enc.user_key.key_check.as_ref().unwrap();
    assert!(verify_key_check(check, &license.id().to_string(), &uk));

    assert_eq!(license.links["publication"], publication());
    assert_eq!(license.rights.as_ref().unwrap().print, Some(10));
}

#[test]
fn listed_user_fields_are_encrypted() {
    let (license, _, uk) = issue();
    let stored = license.user.email.as_deref().unwrap();
    assert_ne!(stored, "reader@example.org");
    let clear = decrypt_field(&STANDARD.decode(stored).unwrap(), &uk).unwrap();
    assert_eq!(clear, b"reader@example.org");
    assert_eq!(license.user.id, "user-42");
}

#[test]
fn unknown_encrypted_field_rejected() {
    let mut draft = basic_draft();
    draft.user.encrypted = vec!["id".to_string()];
    let err = issuer()
        .issue(
            draft,
            &ContentKey::generate(),
            &UserKey::from_passphrase("p"),
            publication(),
        )
        .unwrap_err();
    assert!(matches!(err, LicenseError::Validation(_)));
}

#[test]
fn default_profile_cannot_be_issued_here() {
    let mut draft = basic_draft();
    draft.encryption.profile = String::new();
    let err = issuer()
        .issue(
            draft,
            &ContentKey::generate(),
            &UserKey::from_passphrase("p"),
            publication(),
        )
        .unwrap_err();
    match err {
        LicenseError::Crypto(CryptoError::UnsupportedProfile(p)) => assert_eq!(p, DEFAULT_PROFILE),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn tampering_breaks_signature() {
    let (license, _, _) = issue();

    let mut changed_rights = license.clone();
    changed_rights.rights.as_mut().unwrap().print = Some(11);
    assert!(verify_license_certificate(&changed_rights).is_err());

    let mut changed_link = license.clone();
    changed_link.links.get_mut("publication").unwrap().href.push('x');
    assert!(verify_license_certificate(&changed_link).is_err());
}

#[test]
fn json_roundtrip_still_verifies() {
    let (license, _, _) = issue();
    let json = serde_json::to_string_pretty(&license).unwrap();
    let back: License = serde_json::from_str(&json).unwrap();
    verify_license_certificate(&back).unwrap();
}

#[test]
fn field_order_of_incoming_document_does_not_matter() {
    let (license, _, _) = issue();
    let value = serde_json::to_value(&license).unwrap();
    let obj = value.as_object().unwrap();
    // Rebuild the object with keys in reverse order.
    let reversed: String = {
        let parts: Vec<String> = obj
            .iter()
            .rev()
            .map(|(k, v)| format!("{}:{}", serde_json::to_string(k).unwrap(), v))
            .collect();
        format!("{{{}}}", parts.join(","))
    };
    let back: License = serde_json::from_str(&reversed).unwrap();
    verify_license_certificate(&back).unwrap();
}

#[test]
fn unsigned_license_reported() {
    let license = License::new();
    assert!(matches!(
        verify_license_certificate(&license),
        Err(LicenseError::Unsigned(_))
    ));
}

#[test]
fn resigning_after_change_verifies() {
    let (mut license, _, _) = issue();
    license.rights.as_mut().unwrap().copy = Some(0);
    let issuer = issuer();
    issuer.sign(&mut license).unwrap();
    verify_license(&license, &issuer.signer().public_key()).unwrap();
}

#[test]
fn received_document_verifies() {
    let (license, _, _) = issue();
    let json = serde_json::to_vec_pretty(&license).unwrap();
    let back = verify_license_document_certificate(&json).unwrap();
    assert_eq!(back, license);
    let back = verify_license_document(&json, &issuer().signer().public_key()).unwrap();
    assert_eq!(back.id(), license.id());
}

#[test]
fn injected_members_break_document_signature() {
    let (license, _, _) = issue();
    let public_key = issuer().signer().public_key();
    let mut doc = serde_json::to_value(&license).unwrap();
    doc["rights"]["print_unlimited"] = serde_json::json!(true);
    doc["user"]["role"] = serde_json::json!("admin");
    let json = serde_json::to_vec(&doc).unwrap();

    // The model ignores both members, so the typed form still matches.
    let parsed: License = serde_json::from_slice(&json).unwrap();
    assert_eq!(parsed, license);

    assert!(matches!(
        verify_license_document_certificate(&json),
        Err(LicenseError::Crypto(_))
    ));
    assert!(matches!(
        verify_license_document(&json, &public_key),
        Err(LicenseError::Crypto(_))
    ));
}

#[test]
fn injected_top_level_member_breaks_document_signature() {
    let (license, _, _) = issue();
    let mut doc = serde_json::to_value(&license).unwrap();
    doc["status"] = serde_json::json!("https://lsd.example/licenses/forged/status");
    let json = serde_json::to_vec(&doc).unwrap();
    assert!(verify_license_document_certificate(&json).is_err());
}

#[test]
fn unsigned_or_malformed_document_reported() {
    let json = serde_json::to_vec(&License::new()).unwrap();
    assert!(matches!(
        verify_license_document_certificate(&json),
        Err(LicenseError::Unsigned(_))
    ));
    assert!(matches!(
        verify_license_document_certificate(b"[1, 2, 3]"),
        Err(LicenseError::Malformed(_))
    ));
    assert!(matches!(
        verify_license_document_certificate(b"{not json"),
        Err(LicenseError::Malformed(_))
    ));
}

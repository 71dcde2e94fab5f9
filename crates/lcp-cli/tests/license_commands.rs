//! Sign and verify subcommands on license files.

use std::path::PathBuf;

use lcp_cli::config::{CertificateConfig, Config};
use lcp_cli::license::{
    run_canonicalize, run_sign, run_verify, CanonicalizeArgs, SignArgs, VerifyArgs,
};
use lcp_license::License;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../lcp-crypto/tests/fixtures")
        .join(name)
}

fn signing_config() -> Config {
    Config {
        certificate: Some(CertificateConfig {
            cert: fixture("cert.pem"),
            private_key: fixture("rsa_pkcs1.pem"),
        }),
        ..Config::default()
    }
}

fn write_unsigned(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("license.json");
    let mut license = License::new();
    license.user.id = "user-1".to_string();
    std::fs::write(&path, serde_json::to_vec(&license).unwrap()).unwrap();
    path
}

#[test]
fn sign_then_verify_against_provider_key() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_unsigned(dir.path());
    let signed = dir.path().join("signed.json");
    let config = signing_config();

    let code = run_sign(
        &SignArgs {
            input,
            out: Some(signed.clone()),
        },
        &config,
    )
    .unwrap();
    assert_eq!(code, 0);

    for provider in [false, true] {
        let code = run_verify(
            &VerifyArgs {
                input: signed.clone(),
                provider,
            },
            &config,
        )
        .unwrap();
        assert_eq!(code, 0);
    }
}

#[test]
fn tampered_license_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_unsigned(dir.path());
    let signed = dir.path().join("signed.json");
    let config = signing_config();
    run_sign(
        &SignArgs {
            input,
            out: Some(signed.clone()),
        },
        &config,
    )
    .unwrap();

    let mut license: License =
        serde_json::from_slice(&std::fs::read(&signed).unwrap()).unwrap();
    license.user.id = "user-2".to_string();
    std::fs::write(&signed, serde_json::to_vec(&license).unwrap()).unwrap();

    let code = run_verify(
        &VerifyArgs {
            input: signed,
            provider: false,
        },
        &config,
    )
    .unwrap();
    assert_eq!(code, 1);
}

#[test]
fn injected_member_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_unsigned(dir.path());
    let signed = dir.path().join("signed.json");
    let config = signing_config();
    run_sign(
        &SignArgs {
            input,
            out: Some(signed.clone()),
        },
        &config,
    )
    .unwrap();

    let mut doc: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&signed).unwrap()).unwrap();
    doc["user"]["role"] = serde_json::json!("admin");
    std::fs::write(&signed, serde_json::to_vec(&doc).unwrap()).unwrap();

    for provider in [false, true] {
        let code = run_verify(
            &VerifyArgs {
                input: signed.clone(),
                provider,
            },
            &config,
        )
        .unwrap();
        assert_eq!(code, 1);
    }
}

#[test]
fn verify_rejects_non_license_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.json");
    std::fs::write(&path, br#"{"hello": "world"}"#).unwrap();
    assert!(run_verify(
        &VerifyArgs {
            input: path,
            provider: false,
        },
        &Config::default(),
    )
    .is_err());
}

#[test]
fn unsigned_license_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_unsigned(dir.path());
    let code = run_verify(
        &VerifyArgs {
            input,
            provider: false,
        },
        &Config::default(),
    )
    .unwrap();
    assert_eq!(code, 1);
}

#[test]
fn sign_without_certificate_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_unsigned(dir.path());
    assert!(run_sign(&SignArgs { input, out: None }, &Config::default()).is_err());
}

#[test]
fn canonicalize_rejects_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    std::fs::write(&good, br#"{"b": 1, "a": [true, null]}"#).unwrap();
    std::fs::write(&bad, b"{not json").unwrap();

    let ok = run_canonicalize(&CanonicalizeArgs {
        input: good,
        digest: true,
    })
    .unwrap();
    assert_eq!(ok, 0);
    assert!(run_canonicalize(&CanonicalizeArgs {
        input: bad,
        digest: false,
    })
    .is_err());
}

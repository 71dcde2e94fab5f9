//! # License Document Subcommands
//!
//! `canonicalize`, `sign` and `verify` operate on JSON files.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use lcp_core::{sha256_hex, CanonicalBytes};
use lcp_license::{
    verify_license_document, verify_license_document_certificate, Issuer, License, LicenseError,
};

use crate::config::Config;

/// Arguments for the canonicalize subcommand.
#[derive(Args, Debug)]
pub struct CanonicalizeArgs {
    /// JSON document to canonicalize.
    pub input: PathBuf,

    /// Print the SHA-256 of the canonical form instead of the form itself.
    #[arg(long)]
    pub digest: bool,
}

/// Arguments for the sign subcommand.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// License document to (re-)sign with the configured provider key.
    pub input: PathBuf,

    /// Write the signed license here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the verify subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// License document to verify.
    pub input: PathBuf,

    /// Require the signature to come from the configured provider key,
    /// not only from the certificate embedded in the license.
    #[arg(long)]
    pub provider: bool,
}

fn read_license(path: &Path) -> Result<License> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not a license document", path.display()))
}

pub fn run_canonicalize(args: &CanonicalizeArgs) -> Result<u8> {
    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let canonical = CanonicalBytes::from_json_slice(&bytes)
        .with_context(|| format!("{} is not valid JSON", args.input.display()))?;

    let mut stdout = std::io::stdout().lock();
    if args.digest {
        writeln!(stdout, "{}", sha256_hex(&canonical))?;
    } else {
        stdout.write_all(canonical.as_bytes())?;
        writeln!(stdout)?;
    }
    Ok(0)
}

pub fn run_sign(args: &SignArgs, config: &Config) -> Result<u8> {
    let mut license = read_license(&args.input)?;
    let issuer = Issuer::new(config.signer()?);
    issuer.sign(&mut license)?;

    let json = serde_json::to_string_pretty(&license)?;
    match &args.out {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{json}"),
    }
    tracing::info!(license_id = %license.id(), "signed license");
    Ok(0)
}

pub fn run_verify(args: &VerifyArgs, config: &Config) -> Result<u8> {
    let path = &args.input;
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let outcome = if args.provider {
        let signer = config.signer()?;
        verify_license_document(&bytes, &signer.public_key())
    } else {
        verify_license_document_certificate(&bytes)
    };

    match outcome {
        Ok(license) => {
            println!("{}: signature valid", license.id());
            Ok(0)
        }
        Err(e @ LicenseError::Malformed(_)) => Err(anyhow::Error::new(e)
            .context(format!("{} is not a license document", path.display()))),
        Err(e) => {
            println!("{}: signature invalid ({e})", path.display());
            Ok(1)
        }
    }
}

//! # Encrypt Subcommand
//!
//! Runs the encryption pipeline over one or more packages. Packages are
//! independent, so each runs on its own blocking thread. One JSON report
//! line per encrypted package is printed to stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Args;
use lcp_pack::{encrypt_package, EncryptionArtifact};
use lcp_store::{open_object_store, ObjectStore};
use serde::Serialize;

use crate::config::Config;

/// Arguments for the encrypt subcommand.
#[derive(Args, Debug)]
pub struct EncryptArgs {
    /// Cleartext packages to encrypt.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory receiving the encrypted packages.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Encryption profile. Defaults to the configured profile.
    #[arg(long)]
    pub profile: Option<String>,

    /// Also place each encrypted package in the configured object storage.
    #[arg(long)]
    pub store: bool,
}

/// What the license server needs to know about an encrypted package.
#[derive(Debug, Serialize)]
pub struct EncryptionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub profile: String,
    /// Base64 content key, to be wrapped into licenses for this package.
    pub content_key: String,
    pub size: u64,
    pub checksum: String,
    pub encrypted_resources: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl EncryptionReport {
    fn new(input: PathBuf, artifact: EncryptionArtifact, public_url: Option<String>) -> Self {
        Self {
            input,
            output: artifact.path,
            profile: artifact.profile,
            content_key: STANDARD.encode(artifact.content_key.as_bytes()),
            size: artifact.size,
            checksum: artifact.checksum,
            encrypted_resources: artifact.resources.len(),
            public_url,
        }
    }
}

/// Output location for `input`: `<output_dir>/<stem>.lcp.<ext>`.
pub fn output_path(output_dir: &Path, input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("input {} has no usable file name", input.display()))?;
    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.lcp.{ext}"),
        None => format!("{stem}.lcp"),
    };
    Ok(output_dir.join(name))
}

pub async fn run_encrypt(args: &EncryptArgs, config: &Config) -> Result<u8> {
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;
    let profile = args
        .profile
        .clone()
        .unwrap_or_else(|| config.profile().to_string());
    let store: Option<Arc<dyn ObjectStore>> = if args.store {
        Some(Arc::from(open_object_store(&config.storage)?))
    } else {
        None
    };

    let mut tasks = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let output = output_path(&args.output_dir, input)?;
        let input = input.clone();
        let profile = profile.clone();
        let store = store.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            encrypt_one(&profile, input, &output, store.as_deref())
        }));
    }

    let mut failed = 0usize;
    for joined in futures::future::join_all(tasks).await {
        match joined.context("encryption task panicked")? {
            Ok(report) => println!("{}", serde_json::to_string(&report)?),
            Err(e) => {
                failed += 1;
                tracing::error!("{e:#}");
            }
        }
    }

    if failed > 0 {
        tracing::error!(failed, total = args.inputs.len(), "some packages were not encrypted");
        return Ok(1);
    }
    Ok(0)
}

fn encrypt_one(
    profile: &str,
    input: PathBuf,
    output: &Path,
    store: Option<&dyn ObjectStore>,
) -> Result<EncryptionReport> {
    let artifact = encrypt_package(profile, &input, output)?;

    let public_url = match store {
        Some(store) => {
            let key = output
                .file_name()
                .and_then(|n| n.to_str())
                .context("output has no file name")?;
            let mut file = std::fs::File::open(output)
                .with_context(|| format!("cannot reopen {}", output.display()))?;
            let item = store
                .add(key, &mut file)
                .with_context(|| format!("cannot store {key}"))?;
            Some(item.public_url().to_string()).filter(|u| !u.is_empty())
        }
        None => None,
    };

    Ok(EncryptionReport::new(input, artifact, public_url))
}

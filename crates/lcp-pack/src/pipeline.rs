//! # Encryption Pipeline
//!
//! `encrypt_package` turns a cleartext zip publication into a protected
//! one. Stages run in order and stop at the first failure:
//!
//! 1. open the input archive,
//! 2. create the output file,
//! 3. encrypt or copy every entry, and write `META-INF/encryption.xml`
//!    for EPUB packages ([`process`]),
//! 4. finish the output archive,
//! 5. re-read the output for its size and SHA-256.
//!
//! ## Security Invariant
//!
//! One content key is generated per package and never leaves the returned
//! artifact. Every encrypted resource gets its own IV from the resource
//! cipher, so no two resources share cipher state.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use lcp_core::sha256_reader;
use lcp_crypto::{publication_resource_cipher, ContentKey, ResourceCipher};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::encryption::{self, CONTAINER_XML, ENCRYPTION_XML};
use crate::error::PipelineError;

/// Entries that must stay readable to any reading system.
const MIMETYPE: &str = "mimetype";
const META_INF: &str = "META-INF/";
const MANIFEST: &str = "manifest.json";

/// An encrypted resource as recorded in the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedResource {
    pub path: String,
    pub original_size: u64,
    pub encrypted_size: u64,
    pub algorithm: &'static str,
}

/// The result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct EncryptionArtifact {
    pub path: PathBuf,
    pub profile: String,
    pub content_key: ContentKey,
    /// Output size in bytes.
    pub size: u64,
    /// Lowercase hex SHA-256 of the output file.
    pub checksum: String,
    pub resources: Vec<EncryptedResource>,
}

/// Whether an entry is encrypted, as opposed to copied unchanged.
pub fn is_encryptable(name: &str) -> bool {
    !(name == MIMETYPE || name == MANIFEST || name.starts_with(META_INF) || name.ends_with('/'))
}

/// Encrypt the package at `input` into a new package at `output`.
///
/// A partially written output is removed on failure.
pub fn encrypt_package(
    profile: &str,
    input: &Path,
    output: &Path,
) -> Result<EncryptionArtifact, PipelineError> {
    let result = run(profile, input, output);
    match &result {
        Ok(artifact) => tracing::info!(
            input = %input.display(),
            output = %output.display(),
            resources = artifact.resources.len(),
            size = artifact.size,
            "encrypted package"
        ),
        Err(err) => {
            tracing::error!(
                stage = err.stage(),
                input = %input.display(),
                error = %err,
                "encryption pipeline failed"
            );
            let created = !matches!(
                err,
                PipelineError::InputUnreadable { .. } | PipelineError::OutputUncreatable { .. }
            );
            if created {
                if let Err(e) = fs::remove_file(output) {
                    tracing::warn!(
                        output = %output.display(),
                        error = %e,
                        "could not remove partial output"
                    );
                }
            }
        }
    }
    result
}

fn run(profile: &str, input: &Path, output: &Path) -> Result<EncryptionArtifact, PipelineError> {
    let unreadable = |reason: String| PipelineError::InputUnreadable {
        path: input.to_path_buf(),
        reason,
    };
    let file = File::open(input).map_err(|e| unreadable(e.to_string()))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| unreadable(e.to_string()))?;

    let out = File::create(output).map_err(|source| PipelineError::OutputUncreatable {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = ZipWriter::new(BufWriter::new(out));

    let cipher = publication_resource_cipher();
    let content_key = ContentKey::generate();
    let resources = process(&mut archive, &mut writer, cipher.as_ref(), &content_key)?;

    let buffered = writer
        .finish()
        .map_err(|e| PipelineError::WriterClose(e.to_string()))?;
    let file = buffered
        .into_inner()
        .map_err(|e| PipelineError::WriterClose(e.error().to_string()))?;
    file.sync_all()
        .map_err(|e| PipelineError::WriterClose(e.to_string()))?;
    drop(file);

    let reread = File::open(output).map_err(PipelineError::Checksum)?;
    let (digest, size) = sha256_reader(BufReader::new(reread)).map_err(PipelineError::Checksum)?;

    Ok(EncryptionArtifact {
        path: output.to_path_buf(),
        profile: profile.to_string(),
        content_key,
        size,
        checksum: digest.to_hex(),
        resources,
    })
}

/// Walk every entry of `archive` in order, encrypting eligible resources
/// into `writer` and copying the rest byte for byte.
///
/// In an EPUB package (one with `META-INF/container.xml`) the encrypted
/// resources are then declared in `META-INF/encryption.xml`, extending the
/// package's own copy when it has one. Resources that copy already lists
/// are left as they are. Other packages declare encryption in their own
/// manifest, which is not rewritten here.
pub fn process<R, W>(
    archive: &mut ZipArchive<R>,
    writer: &mut ZipWriter<W>,
    cipher: &dyn ResourceCipher,
    key: &ContentKey,
) -> Result<Vec<EncryptedResource>, PipelineError>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let mut encrypted = Vec::new();
    // Ciphertext does not compress; store it as is.
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let is_epub = archive.file_names().any(|n| n == CONTAINER_XML);
    let existing = if is_epub {
        read_existing_declarations(archive)?
    } else {
        None
    };

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| processing(&format!("entry #{index}"), e))?;
        let name = entry.name().to_string();

        if is_epub && name == ENCRYPTION_XML {
            // Rewritten below.
            continue;
        }
        let declared = existing
            .as_deref()
            .is_some_and(|doc| encryption::lists_resource(doc, &name));
        if entry.is_dir() || !is_encryptable(&name) || declared {
            writer
                .raw_copy_file(entry)
                .map_err(|e| processing(&name, e))?;
            tracing::debug!(resource = %name, "copied resource");
            continue;
        }

        let original_size = entry.size();
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| processing(&name, e))?;
        let encrypted_size = cipher
            .encrypt(key, &mut entry, writer)
            .map_err(|e| processing(&name, e))?;

        tracing::debug!(resource = %name, original_size, encrypted_size, "encrypted resource");
        encrypted.push(EncryptedResource {
            path: name,
            original_size,
            encrypted_size,
            algorithm: cipher.algorithm(),
        });
    }

    if is_epub && (existing.is_some() || !encrypted.is_empty()) {
        let document = encryption::render(existing.as_deref(), &encrypted).ok_or_else(|| {
            processing(ENCRYPTION_XML, "no closing encryption element to extend")
        })?;
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(ENCRYPTION_XML, deflated)
            .map_err(|e| processing(ENCRYPTION_XML, e))?;
        writer
            .write_all(document.as_bytes())
            .map_err(|e| processing(ENCRYPTION_XML, e))?;
    }
    Ok(encrypted)
}

/// The package's own `META-INF/encryption.xml`, if it has one.
fn read_existing_declarations<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Option<String>, PipelineError> {
    let mut entry = match archive.by_name(ENCRYPTION_XML) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(processing(ENCRYPTION_XML, e)),
    };
    let mut document = String::new();
    entry
        .read_to_string(&mut document)
        .map_err(|e| processing(ENCRYPTION_XML, e))?;
    Ok(Some(document))
}

fn processing(resource: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Processing {
        resource: resource.to_string(),
        reason: err.to_string(),
    }
}

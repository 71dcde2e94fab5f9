//! Encryption pipeline over real zip files in a temporary directory.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use lcp_core::sha256_hex_of;
use lcp_crypto::{Aes256CbcCipher, ContentKey, ResourceCipher, BASIC_PROFILE};
use lcp_pack::{encrypt_package, process, PipelineError, ENCRYPTION_XML};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const CHAPTER: &[u8] = b"<html><body><p>Call me Ishmael.</p></body></html>";
const CONTAINER: &[u8] = b"<container><rootfiles/></container>";
const MARKER: &[u8] = b"CORRUPTIBLE-STORED-PAYLOAD-0123456789";

fn write_package(path: &Path, extra: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(CONTAINER).unwrap();
    zip.add_directory("OEBPS/", deflated).unwrap();
    zip.start_file("OEBPS/chapter1.xhtml", deflated).unwrap();
    zip.write_all(CHAPTER).unwrap();
    zip.start_file("OEBPS/chapter2.xhtml", deflated).unwrap();
    zip.write_all(CHAPTER).unwrap();
    for (name, data) in extra {
        zip.start_file(*name, stored).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn read_entry<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut out).unwrap();
    out
}

fn decrypt(key: &ContentKey, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    Aes256CbcCipher
        .decrypt(key, &mut &data[..], &mut out)
        .unwrap();
    out
}

#[test]
fn encrypts_resources_and_copies_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.epub");
    let output = dir.path().join("book.lcp.epub");
    write_package(&input, &[]);

    let artifact = encrypt_package(BASIC_PROFILE, &input, &output).unwrap();
    assert_eq!(artifact.path, output);
    assert_eq!(artifact.profile, BASIC_PROFILE);

    let paths: Vec<_> = artifact.resources.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["OEBPS/chapter1.xhtml", "OEBPS/chapter2.xhtml"]);
    assert_eq!(artifact.resources[0].original_size, CHAPTER.len() as u64);

    let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
    assert_eq!(archive.by_index(0).unwrap().name(), "mimetype");
    assert_eq!(read_entry(&mut archive, "mimetype"), b"application/epub+zip");
    assert_eq!(read_entry(&mut archive, "META-INF/container.xml"), CONTAINER);

    let c1 = read_entry(&mut archive, "OEBPS/chapter1.xhtml");
    let c2 = read_entry(&mut archive, "OEBPS/chapter2.xhtml");
    assert_ne!(c1, CHAPTER);
    // Same plaintext, fresh IV per resource.
    assert_ne!(c1, c2);
    assert_eq!(decrypt(&artifact.content_key, &c1), CHAPTER);
    assert_eq!(decrypt(&artifact.content_key, &c2), CHAPTER);
}

#[test]
fn artifact_size_and_checksum_match_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.epub");
    let output = dir.path().join("out.epub");
    write_package(&input, &[]);

    let artifact = encrypt_package(BASIC_PROFILE, &input, &output).unwrap();
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(artifact.size, bytes.len() as u64);
    assert_eq!(artifact.checksum, sha256_hex_of(&bytes));
    assert_eq!(artifact.checksum.len(), 64);
}

#[test]
fn each_package_gets_its_own_key() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.epub");
    write_package(&input, &[]);
    let a = encrypt_package(BASIC_PROFILE, &input, &dir.path().join("a.epub")).unwrap();
    let b = encrypt_package(BASIC_PROFILE, &input, &dir.path().join("b.epub")).unwrap();
    assert_ne!(a.content_key, b.content_key);
}

#[test]
fn missing_input_is_input_stage() {
    let dir = tempfile::tempdir().unwrap();
    let err = encrypt_package(
        BASIC_PROFILE,
        &dir.path().join("absent.epub"),
        &dir.path().join("out.epub"),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::InputUnreadable { .. }));
    assert_eq!(err.stage(), "input");
}

#[test]
fn non_zip_input_is_input_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, b"definitely not a zip archive").unwrap();
    let err = encrypt_package(BASIC_PROFILE, &input, &dir.path().join("out.epub")).unwrap_err();
    assert!(matches!(err, PipelineError::InputUnreadable { .. }));
}

#[test]
fn uncreatable_output_is_output_stage() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.epub");
    write_package(&input, &[]);
    let err = encrypt_package(
        BASIC_PROFILE,
        &input,
        &dir.path().join("no-such-dir").join("out.epub"),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::OutputUncreatable { .. }));
    assert_eq!(err.stage(), "output");
}

#[test]
fn corrupt_resource_is_processing_stage_and_output_removed() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.epub");
    let output = dir.path().join("out.epub");
    write_package(&input, &[("OEBPS/data.bin", MARKER)]);

    // Flip one byte of the stored payload so its CRC no longer matches.
    let mut bytes = std::fs::read(&input).unwrap();
    let at = bytes
        .windows(MARKER.len())
        .position(|w| w == MARKER)
        .unwrap();
    bytes[at] ^= 0xff;
    std::fs::write(&input, &bytes).unwrap();

    let err = encrypt_package(BASIC_PROFILE, &input, &output).unwrap_err();
    match &err {
        PipelineError::Processing { resource, .. } => assert_eq!(resource, "OEBPS/data.bin"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn process_works_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.epub");
    write_package(&input, &[]);

    let mut archive = ZipArchive::new(File::open(&input).unwrap()).unwrap();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let key = ContentKey::generate();
    let done = process(&mut archive, &mut writer, &Aes256CbcCipher, &key).unwrap();
    assert_eq!(done.len(), 2);

    let buffer = writer.finish().unwrap().into_inner();
    let mut out = ZipArchive::new(Cursor::new(buffer)).unwrap();
    // Every input entry plus the encryption declarations.
    assert_eq!(out.len(), archive.len() + 1);
    let c1 = read_entry(&mut out, "OEBPS/chapter1.xhtml");
    assert_eq!(decrypt(&key, &c1), CHAPTER);
}

fn entry_string(path: &Path, name: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    String::from_utf8(read_entry(&mut archive, name)).unwrap()
}

#[test]
fn epub_declares_encrypted_resources() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.epub");
    let output = dir.path().join("out.epub");
    write_package(&input, &[]);

    encrypt_package(BASIC_PROFILE, &input, &output).unwrap();
    let doc = entry_string(&output, ENCRYPTION_XML);
    assert_eq!(doc.matches("<EncryptedData ").count(), 2);
    assert!(doc.contains(r#"<CipherReference URI="OEBPS/chapter1.xhtml"/>"#));
    assert!(doc.contains(r#"<CipherReference URI="OEBPS/chapter2.xhtml"/>"#));
    assert!(doc.contains(&format!(r#"OriginalLength="{}""#, CHAPTER.len())));
    assert!(doc.contains(r#"URI="license.lcpl#/encryption/content_key""#));
    assert!(!doc.contains("container.xml"));
}

#[test]
fn existing_declarations_are_kept_and_extended() {
    const FONT: &[u8] = b"already obfuscated font bytes";
    let existing = "<?xml version=\"1.0\"?>\n\
        <encryption xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n\
        <EncryptedData><CipherData><CipherReference URI=\"OEBPS/font.otf\"/>\
        </CipherData></EncryptedData>\n</encryption>\n";

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.epub");
    let output = dir.path().join("out.epub");
    write_package(
        &input,
        &[
            (ENCRYPTION_XML, existing.as_bytes()),
            ("OEBPS/font.otf", FONT),
        ],
    );

    let artifact = encrypt_package(BASIC_PROFILE, &input, &output).unwrap();
    let paths: Vec<_> = artifact.resources.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["OEBPS/chapter1.xhtml", "OEBPS/chapter2.xhtml"]);

    let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
    assert_eq!(read_entry(&mut archive, "OEBPS/font.otf"), FONT);
    let declared = archive
        .file_names()
        .filter(|n| *n == ENCRYPTION_XML)
        .count();
    assert_eq!(declared, 1);

    let doc = entry_string(&output, ENCRYPTION_XML);
    assert!(doc.contains(r#"URI="OEBPS/font.otf""#));
    assert!(doc.contains(r#"URI="OEBPS/chapter1.xhtml""#));
    assert!(doc.trim_end().ends_with("</encryption>"));
}

#[test]
fn non_epub_package_gets_no_declarations() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.audiobook");
    let output = dir.path().join("book.lcp.audiobook");
    let mut zip = ZipWriter::new(File::create(&input).unwrap());
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("manifest.json", stored).unwrap();
    zip.write_all(br#"{"readingOrder": []}"#).unwrap();
    zip.start_file("audio/track1.mp3", stored).unwrap();
    zip.write_all(MARKER).unwrap();
    zip.finish().unwrap();

    let artifact = encrypt_package(BASIC_PROFILE, &input, &output).unwrap();
    assert_eq!(artifact.resources.len(), 1);
    let archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
    assert!(!archive.file_names().any(|n| n == ENCRYPTION_XML));
    assert_eq!(archive.len(), 2);
}

//! # Object Storage
//!
//! Where encrypted publications are placed for download. The backend is
//! chosen once at startup from [`StorageConfig`] and handed to whoever
//! needs it as a `Box<dyn ObjectStore>`.
//!
//! ## Invariant
//!
//! Keys are single path components. A key containing a separator, `..`, or
//! nothing at all is rejected before any file is touched, so an item can
//! never resolve outside the store directory.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use lcp_core::LcpError;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    key: String,
    public_url: String,
    location: Option<PathBuf>,
}

impl Item {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Download URL of the object. Empty when the backend does not serve
    /// its objects.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Open the object's contents for reading.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, StoreError> {
        let path = self
            .location
            .as_ref()
            .ok_or_else(|| StoreError::NotFound(self.key.clone()))?;
        match File::open(path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(self.key.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A keyed object store.
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Store the contents of `reader` under `key`, replacing any previous
    /// object.
    fn add(&self, key: &str, reader: &mut dyn Read) -> Result<Item, StoreError>;

    fn get(&self, key: &str) -> Result<Item, StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn list(&self) -> Result<Vec<Item>, StoreError>;
}

// ─── Filesystem backend ──────────────────────────────────────────────

/// Objects as files in one directory, served under a base URL.
#[derive(Debug, Clone)]
pub struct FsStore {
    directory: PathBuf,
    public_base_url: String,
}

impl FsStore {
    pub fn new(directory: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn item(&self, key: &str) -> Item {
        Item {
            key: key.to_string(),
            public_url: format!("{}/{}", self.public_base_url, key),
            location: Some(self.directory.join(key)),
        }
    }
}

impl ObjectStore for FsStore {
    fn add(&self, key: &str, reader: &mut dyn Read) -> Result<Item, StoreError> {
        check_key(key)?;
        let path = self.directory.join(key);
        let mut file = File::create(&path)?;
        let written = io::copy(reader, &mut file)?;
        file.flush()?;
        tracing::debug!(key, bytes = written, "stored object");
        Ok(self.item(key))
    }

    fn get(&self, key: &str) -> Result<Item, StoreError> {
        check_key(key)?;
        match fs::metadata(self.directory.join(key)) {
            Ok(meta) if meta.is_file() => Ok(self.item(key)),
            Ok(_) => Err(StoreError::NotFound(key.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        check_key(key)?;
        match fs::remove_file(self.directory.join(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<Item>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys.iter().map(|k| self.item(k)).collect())
    }
}

// ─── No-op backend ───────────────────────────────────────────────────

/// For deployments where packages are hosted elsewhere. `add` accepts
/// and discards the contents; nothing can be read back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStore;

impl ObjectStore for NoStore {
    fn add(&self, key: &str, reader: &mut dyn Read) -> Result<Item, StoreError> {
        io::copy(reader, &mut io::sink())?;
        Ok(Item {
            key: key.to_string(),
            public_url: String::new(),
            location: None,
        })
    }

    fn get(&self, key: &str) -> Result<Item, StoreError> {
        Err(StoreError::NotFound(key.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        Err(StoreError::NotFound(key.to_string()))
    }

    fn list(&self) -> Result<Vec<Item>, StoreError> {
        Err(StoreError::NotFound("object listing".to_string()))
    }
}

// ─── Configuration ───────────────────────────────────────────────────

/// Which backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Fs,
    #[default]
    None,
}

/// Object storage section of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub mode: StorageMode,
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Build the configured backend. The `fs` directory is created if missing.
pub fn open_object_store(config: &StorageConfig) -> Result<Box<dyn ObjectStore>, LcpError> {
    match config.mode {
        StorageMode::None => Ok(Box::new(NoStore)),
        StorageMode::Fs => {
            let directory = config.directory.as_ref().ok_or_else(|| {
                LcpError::Config("storage.directory is required for fs storage".to_string())
            })?;
            let base = config.public_base_url.as_deref().ok_or_else(|| {
                LcpError::Config("storage.public_base_url is required for fs storage".to_string())
            })?;
            url::Url::parse(base).map_err(|e| {
                LcpError::Config(format!("storage.public_base_url {base:?} is invalid: {e}"))
            })?;
            fs::create_dir_all(directory)?;
            tracing::info!(directory = %directory.display(), "using filesystem object storage");
            Ok(Box::new(FsStore::new(directory, base)))
        }
    }
}

fn check_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(|c: char| matches!(c, '/' | '\\' | '\0'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::Storage(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid object key {key:?}"),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_key() {
        assert!(check_key("book.epub").is_ok());
        assert!(check_key("..book").is_ok());
        for bad in ["", ".", "..", "a/b", "../x", "a\\b"] {
            assert!(check_key(bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_no_store() {
        let store = NoStore;
        let item = store.add("k", &mut &b"data"[..]).unwrap();
        assert_eq!(item.key(), "k");
        assert_eq!(item.public_url(), "");
        assert!(matches!(item.open(), Err(StoreError::NotFound(_))));
        assert!(matches!(store.get("k"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.remove("k"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.list(), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_open_none_mode() {
        let store = open_object_store(&StorageConfig::default()).unwrap();
        assert!(store.get("anything").is_err());
    }

    #[test]
    fn test_fs_mode_requires_settings() {
        let config = StorageConfig {
            mode: StorageMode::Fs,
            ..Default::default()
        };
        assert!(matches!(
            open_object_store(&config),
            Err(LcpError::Config(_))
        ));

        let config = StorageConfig {
            mode: StorageMode::Fs,
            directory: Some(PathBuf::from("/tmp/unused")),
            public_base_url: Some("not a url".to_string()),
        };
        assert!(matches!(
            open_object_store(&config),
            Err(LcpError::Config(_))
        ));
    }

    #[test]
    fn test_mode_names() {
        let c: StorageConfig = serde_json::from_str(r#"{"mode":"fs"}"#).unwrap();
        assert_eq!(c.mode, StorageMode::Fs);
        let c: StorageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c.mode, StorageMode::None);
    }
}

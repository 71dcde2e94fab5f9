//! # License Model
//!
//! The license document as exchanged with reading systems. Byte fields
//! serialize as standard base64.
//!
//! ## Invariant
//!
//! `id` and `date` are private. They are set once by
//! [`LicenseDraft::prepare`](crate::LicenseDraft::prepare) and have no
//! setter, so an issued license keeps its identity for life.

use std::collections::BTreeMap;

use lcp_core::{CanonicalBytes, CanonicalizationError, LicenseId, Timestamp};
use lcp_crypto::Signature;
use serde::{Deserialize, Serialize};

/// Encryption metadata of a license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encryption {
    /// Encryption profile URI.
    pub profile: String,
    pub content_key: ContentKeyInfo,
    pub user_key: UserKeyInfo,
}

/// The wrapped content key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKeyInfo {
    pub algorithm: String,
    #[serde(with = "lcp_core::bytes::base64")]
    pub encrypted_value: Vec<u8>,
}

/// How the user key is derived, and how to check it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserKeyInfo {
    pub algorithm: String,
    /// Passphrase hint shown to the user.
    pub hint: String,
    /// The license id encrypted under the user key.
    #[serde(
        default,
        with = "lcp_core::bytes::base64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_check: Option<Vec<u8>>,
}

/// A link to a related resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(
        default,
        with = "lcp_core::bytes::base64_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub digest: Option<Vec<u8>>,
}

/// The user the license is issued to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Names of the fields above that are encrypted under the user key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encrypted: Vec<String>,
}

/// What the user may do with the publication. Members missing from a
/// document take their [`Default`] values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<i32>,
    pub tts: bool,
    pub edit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
}

impl Default for Rights {
    fn default() -> Self {
        Self {
            print: None,
            copy: None,
            tts: true,
            edit: false,
            start: None,
            end: None,
        }
    }
}

/// A prepared license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    id: LicenseId,
    date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
    pub encryption: Encryption,
    pub links: BTreeMap<String, Link>,
    pub user: UserInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<Rights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl License {
    pub(crate) fn from_parts(id: LicenseId, date: Timestamp) -> Self {
        Self {
            id,
            date,
            provider: None,
            updated: None,
            encryption: Encryption::default(),
            links: BTreeMap::new(),
            user: UserInfo::default(),
            rights: None,
            signature: None,
        }
    }

    pub fn id(&self) -> LicenseId {
        self.id
    }

    /// Issue date.
    pub fn date(&self) -> Timestamp {
        self.date
    }

    /// Canonical bytes of the license with its signature removed. This is
    /// what the signature covers.
    pub fn canonical_unsigned(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        let mut unsigned = self.clone();
        unsigned.signature = None;
        CanonicalBytes::new(&unsigned)
    }
}

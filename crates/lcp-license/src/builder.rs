//! # License Builder
//!
//! `LicenseDraft` holds everything a caller may set before issuance.
//! Preparing a draft assigns the identity fields and fills defaults while
//! keeping every field the caller supplied.

use std::collections::BTreeMap;

use lcp_core::{LicenseId, Timestamp};
use lcp_crypto::DEFAULT_PROFILE;

use crate::model::{Encryption, License, Link, Rights, UserInfo};

/// Passphrase hint used when the caller gives none.
pub const DEFAULT_HINT: &str = "Enter your passphrase";

/// A license before it has an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseDraft {
    pub provider: Option<String>,
    pub encryption: Encryption,
    pub links: BTreeMap<String, Link>,
    pub user: UserInfo,
    pub rights: Option<Rights>,
}

impl LicenseDraft {
    /// Assign a fresh v4 id and the current time as issue date, then fill
    /// defaults: profile when empty, rights (tts on, edit off) when absent.
    pub fn prepare(self) -> License {
        self.prepare_at(Timestamp::now())
    }

    pub(crate) fn prepare_at(self, now: Timestamp) -> License {
        let mut license = License::from_parts(LicenseId::new(), now);
        license.provider = self.provider;
        license.encryption = self.encryption;
        license.links = self.links;
        license.user = self.user;
        license.rights = Some(self.rights.unwrap_or_default());

        if license.encryption.profile.is_empty() {
            license.encryption.profile = DEFAULT_PROFILE.to_string();
        }
        license
    }
}

impl License {
    /// An empty license: no links, default profile and rights.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        LicenseDraft::default().prepare()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_digits(id: &str) -> String {
        id.chars().filter(|c| *c != '-').collect()
    }

    /// Top nibble of byte 6.
    fn version_nibble(id: &str) -> u8 {
        u8::from_str_radix(&hex_digits(id)[12..13], 16).unwrap()
    }

    /// Two high bits of byte 8.
    fn variant_bits(id: &str) -> u8 {
        u8::from_str_radix(&hex_digits(id)[16..18], 16).unwrap() >> 6
    }

    #[test]
    fn test_new_has_v4_id_and_default_profile() {
        let l = License::new();
        let id = l.id().to_string();
        assert_eq!(version_nibble(&id), 0b0100);
        assert_eq!(variant_bits(&id), 0b10);
        assert_eq!(l.encryption.profile, DEFAULT_PROFILE);
        assert!(l.links.is_empty());
        assert_eq!(l.rights, Some(Rights::default()));
        assert!(l.signature.is_none());
    }

    #[test]
    fn test_new_date_is_now() {
        let before = Timestamp::now();
        let l = License::new();
        let after = Timestamp::now();
        assert!(l.date() >= before && l.date() <= after);
    }

    #[test]
    fn test_each_license_gets_its_own_id() {
        assert_ne!(License::new().id(), License::new().id());
    }

    #[test]
    fn test_prepare_keeps_caller_fields() {
        let mut draft = LicenseDraft {
            provider: Some("https://provider.example".to_string()),
            ..Default::default()
        };
        draft.user.id = "user-7".to_string();
        draft.user.email = Some("reader@example.org".to_string());
        draft.encryption.profile = lcp_crypto::BASIC_PROFILE.to_string();
        draft.rights = Some(Rights {
            print: Some(10),
            tts: false,
            ..Default::default()
        });
        draft.links.insert(
            "hint".to_string(),
            Link {
                href: "https://provider.example/hint".to_string(),
                ..Default::default()
            },
        );

        let l = draft.clone().prepare();
        assert_eq!(l.provider, draft.provider);
        assert_eq!(l.user, draft.user);
        assert_eq!(l.encryption.profile, lcp_crypto::BASIC_PROFILE);
        assert_eq!(l.rights, draft.rights);
        assert_eq!(l.links, draft.links);
    }

    #[test]
    fn test_prepare_at_uses_given_time() {
        let t = Timestamp::parse("2026-04-01T00:00:00Z").unwrap();
        assert_eq!(LicenseDraft::default().prepare_at(t).date(), t);
    }
}

//! # License Status Document
//!
//! The record tracked for every issued license, and its JSON rendering as
//! the license status document returned to reading systems.
//!
//! The persisted one-hot status integer never appears here: the record
//! carries a decoded [`Status`], or `None` when the stored value was
//! ambiguous.

use lcp_core::Timestamp;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::status::Status;

/// Media type of a license document.
pub const LICENSE_MEDIA_TYPE: &str = "application/vnd.readium.lcp.license.v1.0+json";

/// Media type of a license status document.
pub const STATUS_MEDIA_TYPE: &str = "application/vnd.readium.license.status.v1.0+json";

/// Last-modified times of the license and of its status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Updated {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Timestamp>,
}

/// Upper bound of the rights window a loan may be extended to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PotentialRights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
}

/// A relation link in the status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLink {
    pub rel: String,
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub templated: bool,
}

/// Where status document links point, and which device actions to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Public base URL of the license server.
    pub license_base_url: String,
    /// Public base URL of the status server.
    pub status_base_url: String,
    /// Optional license URL template containing `{license_id}`.
    pub license_link_template: Option<String>,
    pub register: bool,
    pub renew: bool,
    pub return_: bool,
}

/// Status policy applied when a license status is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Start in `ready` and wait for device registration. When false the
    /// status starts `active`.
    pub register: bool,
    /// Minimum loan length in days used to derive the potential rights end.
    pub renting_days: i64,
}

/// The status record of one license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStatus {
    /// Internal row id.
    #[serde(skip)]
    pub id: i64,
    /// External license reference.
    #[serde(rename = "id")]
    pub license_ref: String,
    /// `None` only when the persisted value was ambiguous.
    pub status: Option<Status>,
    pub updated: Updated,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<StatusLink>,
    #[serde(default)]
    pub device_count: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_rights: Option<PotentialRights>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
}

impl LicenseStatus {
    /// Initial status for a freshly issued license.
    ///
    /// A license with a rights end is a loan: its potential rights end is
    /// the later of that end and `issued + renting_days`.
    pub fn for_license(
        license_ref: impl Into<String>,
        issued: Timestamp,
        rights_end: Option<Timestamp>,
        policy: &StatusPolicy,
        now: Timestamp,
    ) -> Self {
        let potential_end = rights_end.map(|end| {
            let by_policy = if policy.renting_days > 0 {
                issued.checked_add_days(policy.renting_days)
            } else {
                None
            };
            match by_policy {
                Some(p) if p > end => p,
                _ => end,
            }
        });

        let status = if policy.register {
            Status::Ready
        } else {
            Status::Active
        };

        Self {
            id: 0,
            license_ref: license_ref.into(),
            status: Some(status),
            updated: Updated {
                license: Some(issued),
                status: Some(now),
            },
            message: String::new(),
            links: Vec::new(),
            device_count: 0,
            potential_rights: potential_end.map(|end| PotentialRights { end: Some(end) }),
            events: Vec::new(),
        }
    }

    /// Current potential rights end, if any.
    pub fn potential_end(&self) -> Option<Timestamp> {
        self.potential_rights.as_ref().and_then(|p| p.end)
    }

    pub(crate) fn set_potential_end(&mut self, end: Timestamp) {
        self.potential_rights = Some(PotentialRights { end: Some(end) });
    }

    /// Fill the message and relation links for the document view.
    pub fn fill_links(&mut self, settings: &LinkSettings) {
        self.message = match self.status {
            Some(s) => s.message().to_string(),
            None => "The license status is unavailable.".to_string(),
        };

        let license_href = match &settings.license_link_template {
            Some(t) => t.replace("{license_id}", &self.license_ref),
            None => format!(
                "{}/licenses/{}",
                settings.license_base_url.trim_end_matches('/'),
                self.license_ref
            ),
        };
        let status_base = format!(
            "{}/licenses/{}",
            settings.status_base_url.trim_end_matches('/'),
            self.license_ref
        );

        let mut links = vec![StatusLink {
            rel: "license".to_string(),
            href: license_href,
            media_type: Some(LICENSE_MEDIA_TYPE.to_string()),
            templated: false,
        }];

        let action = |rel: &str, params: &str| StatusLink {
            rel: rel.to_string(),
            href: format!("{status_base}/{rel}{{?{params}}}"),
            media_type: Some(STATUS_MEDIA_TYPE.to_string()),
            templated: true,
        };

        let has_end = self.potential_end().is_some();
        if settings.register {
            links.push(action("register", "id,name"));
        }
        if settings.return_ && has_end {
            links.push(action("return", "id,name"));
        }
        if settings.renew && has_end {
            links.push(action("renew", "end,id,name"));
        }
        self.links = links;
    }
}

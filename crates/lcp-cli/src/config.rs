//! # Configuration
//!
//! One YAML file describes a deployment. It is read once at startup into a
//! [`Config`] value that is passed explicitly to whatever needs it.
//!
//! ```yaml
//! certificate:
//!   cert: /etc/lcp/cert.pem
//!   private_key: /etc/lcp/privkey.pem
//! database:
//!   url: sqlite:///var/lib/lcp/lcp.db
//! storage:
//!   mode: fs
//!   directory: /var/lib/lcp/files
//!   public_base_url: https://cdn.example.org/files
//! license_status:
//!   register: true
//!   renew: true
//!   return: true
//!   renting_days: 60
//!   renew_days: 7
//! lcp:
//!   public_base_url: https://lcp.example.org
//! lsd:
//!   public_base_url: https://lsd.example.org
//!   license_link_url: https://front.example.org/licenses/{license_id}
//! profile: http://readium.org/lcp/basic-profile
//! compliance:
//!   base_url: https://lsd.example.org
//! ```
//!
//! Every section is optional. Commands that need a missing section fail
//! with a configuration error naming it.

use std::path::{Path, PathBuf};

use lcp_core::LcpError;
use lcp_crypto::{LicenseSigner, BASIC_PROFILE};
use lcp_state::{LinkSettings, StatusPolicy};
use lcp_store::{StatusSettings, StorageConfig};
use serde::Deserialize;

/// Deployment configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub certificate: Option<CertificateConfig>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub license_status: LicenseStatusConfig,
    #[serde(default)]
    pub lcp: ServerConfig,
    #[serde(default)]
    pub lsd: LsdConfig,
    /// Encryption profile for new packages and licenses.
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub compliance: Option<ComplianceConfig>,
}

/// Provider certificate and private key, both PEM files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CertificateConfig {
    pub cert: PathBuf,
    pub private_key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://lcp.db".to_string(),
        }
    }
}

/// Device actions offered to reading systems, and loan periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LicenseStatusConfig {
    #[serde(default)]
    pub register: bool,
    #[serde(default)]
    pub renew: bool,
    #[serde(default, rename = "return")]
    pub return_: bool,
    #[serde(default)]
    pub renting_days: i64,
    #[serde(default)]
    pub renew_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub public_base_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LsdConfig {
    #[serde(default)]
    pub public_base_url: String,
    /// License URL template containing `{license_id}`.
    #[serde(default)]
    pub license_link_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComplianceConfig {
    pub base_url: String,
}

impl Config {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, LcpError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LcpError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_yaml(&text)
            .map_err(|e| LcpError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration text and check cross-field constraints.
    pub fn from_yaml(text: &str) -> Result<Self, LcpError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| LcpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LcpError> {
        let ls = &self.license_status;
        if ls.renting_days < 0 || ls.renew_days < 0 {
            return Err(LcpError::Config(
                "license_status.renting_days and renew_days must not be negative".to_string(),
            ));
        }
        if let Some(template) = &self.lsd.license_link_url {
            if !template.contains("{license_id}") {
                return Err(LcpError::Config(
                    "lsd.license_link_url must contain {license_id}".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The configured profile, or the basic profile.
    pub fn profile(&self) -> &str {
        self.profile.as_deref().unwrap_or(BASIC_PROFILE)
    }

    /// Status service settings derived from the `license_status`, `lcp` and
    /// `lsd` sections.
    pub fn status_settings(&self) -> StatusSettings {
        let ls = &self.license_status;
        StatusSettings {
            policy: StatusPolicy {
                register: ls.register,
                renting_days: ls.renting_days,
            },
            renew_days: ls.renew_days,
            links: LinkSettings {
                license_base_url: self.lcp.public_base_url.clone(),
                status_base_url: self.lsd.public_base_url.clone(),
                license_link_template: self.lsd.license_link_url.clone(),
                register: ls.register,
                renew: ls.renew,
                return_: ls.return_,
            },
        }
    }

    /// Load the provider signing key named by the `certificate` section.
    pub fn signer(&self) -> anyhow::Result<LicenseSigner> {
        let cert = self
            .certificate
            .as_ref()
            .ok_or_else(|| LcpError::Config("no certificate section configured".to_string()))?;
        let read = |p: &Path| {
            std::fs::read_to_string(p)
                .map_err(|e| LcpError::Config(format!("cannot read {}: {e}", p.display())))
        };
        let cert_pem = read(cert.cert.as_path())?;
        let key_pem = read(cert.private_key.as_path())?;
        Ok(LicenseSigner::from_pem(&cert_pem, &key_pem)?)
    }
}

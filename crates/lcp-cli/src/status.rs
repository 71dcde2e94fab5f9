//! # Status Subcommand
//!
//! License status administration against the configured database.
//! Every command prints the resulting status document as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use futures::TryStreamExt;
use lcp_core::Timestamp;
use lcp_license::License;
use lcp_state::Device;
use lcp_store::{events, init_pool, license_status, StatusService};

use crate::config::Config;

/// Arguments for the status subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub command: StatusCommand,
}

/// A client device, as named on the command line.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device identifier.
    #[arg(long = "device-id")]
    pub id: String,

    /// Human-readable device name.
    #[arg(long = "device-name")]
    pub name: String,
}

impl DeviceArgs {
    fn device(&self) -> Result<Device> {
        Ok(Device::new(&self.id, &self.name)?)
    }
}

/// Available status operations.
#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    /// Record an issued license and create its status.
    Init {
        /// Signed license document.
        license: PathBuf,
    },

    /// Print the status document of a license.
    Show { license_ref: String },

    /// Register a device.
    Register {
        license_ref: String,
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Extend a loan.
    Renew {
        license_ref: String,
        #[command(flatten)]
        device: DeviceArgs,
        /// New rights end (RFC 3339). Defaults to the configured renewal period.
        #[arg(long)]
        end: Option<String>,
    },

    /// Return a license from a device.
    Return {
        license_ref: String,
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Revoke a license.
    Revoke { license_ref: String },

    /// Cancel a license that was never used.
    Cancel { license_ref: String },

    /// Expire every loan whose rights end has passed.
    Expire,

    /// Print the event log of a license, one JSON line per event.
    Events { license_ref: String },
}

pub async fn run_status(args: &StatusArgs, config: &Config) -> Result<u8> {
    let pool = init_pool(&config.database.url)
        .await
        .with_context(|| format!("cannot open database {}", config.database.url))?;
    let service = StatusService::new(pool, config.status_settings());

    let document = match &args.command {
        StatusCommand::Init { license: path } => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let license: License = serde_json::from_slice(&bytes)
                .with_context(|| format!("{} is not a license document", path.display()))?;
            if license.signature.is_none() {
                tracing::warn!(license_id = %license.id(), "recording an unsigned license");
            }
            service.create(&license).await?
        }
        StatusCommand::Show { license_ref } => service.document(license_ref).await?,
        StatusCommand::Register {
            license_ref,
            device,
        } => service.register(license_ref, &device.device()?).await?,
        StatusCommand::Renew {
            license_ref,
            device,
            end,
        } => {
            let end = end
                .as_deref()
                .map(Timestamp::parse_lenient)
                .transpose()
                .context("--end is not an RFC 3339 timestamp")?;
            service.renew(license_ref, &device.device()?, end).await?
        }
        StatusCommand::Return {
            license_ref,
            device,
        } => {
            service
                .return_license(license_ref, &device.device()?)
                .await?
        }
        StatusCommand::Revoke { license_ref } => service.revoke(license_ref).await?,
        StatusCommand::Cancel { license_ref } => service.cancel(license_ref).await?,
        StatusCommand::Expire => {
            let expired = service.expire_overdue(Timestamp::now()).await?;
            println!("{}", serde_json::json!({ "expired": expired }));
            return Ok(0);
        }
        StatusCommand::Events { license_ref } => {
            let status = license_status::get_by_license_ref(service.pool(), license_ref).await?;
            let mut stream = events::list_by_owner(service.pool(), status.id);
            while let Some(event) = stream.try_next().await? {
                println!("{}", serde_json::to_string(&event)?);
            }
            return Ok(0);
        }
    };

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(0)
}

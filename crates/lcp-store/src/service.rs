//! # Status Service
//!
//! Runs license status transitions against the database.
//!
//! ## Atomicity Invariant
//!
//! Every transition holds the license's entry in [`LicenseLocks`] for its
//! whole read-check-write sequence, and writes the status UPDATE and the
//! event INSERT in one SQL transaction. A failure at any point rolls back
//! both, so the log never shows an event whose status change was lost, or
//! the reverse.

use futures::TryStreamExt;
use lcp_core::Timestamp;
use lcp_license::License;
use lcp_state::{
    Device, EventType, LicenseStatus, LinkSettings, RegisterOutcome, RenewRequest, StateError,
    Status, StatusPolicy,
};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::StoreError;
use crate::locks::LicenseLocks;
use crate::{events, license_status, licenses};

/// Operator settings for status handling.
#[derive(Debug, Clone)]
pub struct StatusSettings {
    pub policy: StatusPolicy,
    /// Default renewal period in days when a client names no end.
    pub renew_days: i64,
    pub links: LinkSettings,
}

/// Transactional front of the status and event stores.
#[derive(Debug, Clone)]
pub struct StatusService {
    pool: SqlitePool,
    locks: LicenseLocks,
    settings: StatusSettings,
}

impl StatusService {
    pub fn new(pool: SqlitePool, settings: StatusSettings) -> Self {
        Self {
            pool,
            locks: LicenseLocks::new(),
            settings,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn settings(&self) -> &StatusSettings {
        &self.settings
    }

    // ─── Issuance ────────────────────────────────────────────────────

    /// Record an issued license and create its initial status.
    pub async fn create(&self, license: &License) -> Result<LicenseStatus, StoreError> {
        self.create_at(license, Timestamp::now()).await
    }

    pub async fn create_at(
        &self,
        license: &License,
        now: Timestamp,
    ) -> Result<LicenseStatus, StoreError> {
        let license_ref = license.id().to_string();
        let rights_end = license.rights.as_ref().and_then(|r| r.end);
        let mut status = LicenseStatus::for_license(
            &license_ref,
            license.date(),
            rights_end,
            &self.settings.policy,
            now,
        );

        let _guard = self.locks.lock(&license_ref).await;
        let mut tx = self.pool.begin().await?;
        licenses::add(&mut *tx, license).await?;
        status.id = license_status::add(&mut *tx, &status).await?;
        tx.commit().await?;

        tracing::info!(
            license_ref = %license_ref,
            status = ?status.status,
            "created license status"
        );
        status.fill_links(&self.settings.links);
        Ok(status)
    }

    // ─── Lookups ─────────────────────────────────────────────────────

    /// The status document of a license, with its events and links.
    ///
    /// A loan whose rights end has passed is moved to `expired` first.
    pub async fn document(&self, license_ref: &str) -> Result<LicenseStatus, StoreError> {
        self.document_at(license_ref, Timestamp::now()).await
    }

    pub async fn document_at(
        &self,
        license_ref: &str,
        now: Timestamp,
    ) -> Result<LicenseStatus, StoreError> {
        let _guard = self.locks.lock(license_ref).await;
        let mut tx = self.pool.begin().await?;
        let mut status = license_status::get_by_license_ref(&mut *tx, license_ref).await?;
        if status.expire_if_due(now) {
            license_status::update(&mut *tx, &status).await?;
            tracing::info!(license_ref = %license_ref, "license expired");
        }
        let status = self.assemble(&mut *tx, status).await?;
        tx.commit().await?;
        Ok(status)
    }

    // ─── Device transitions ──────────────────────────────────────────

    /// Register a device on a license. Registering the same device twice
    /// changes nothing and appends no event.
    pub async fn register(
        &self,
        license_ref: &str,
        device: &Device,
    ) -> Result<LicenseStatus, StoreError> {
        self.register_at(license_ref, device, Timestamp::now()).await
    }

    pub async fn register_at(
        &self,
        license_ref: &str,
        device: &Device,
        now: Timestamp,
    ) -> Result<LicenseStatus, StoreError> {
        if !self.settings.links.register {
            return Err(StoreError::ActionDisabled("register"));
        }
        let _guard = self.locks.lock(license_ref).await;
        let mut tx = self.pool.begin().await?;
        let mut status = license_status::get_by_license_ref(&mut *tx, license_ref).await?;

        let already = device_is_active(&mut *tx, status.id, device).await?;

        match status.register(device, already, now)? {
            RegisterOutcome::Registered(event) => {
                license_status::update(&mut *tx, &status).await?;
                events::add(&mut *tx, &event).await?;
                tracing::info!(
                    license_ref = %license_ref,
                    device_id = %device.id(),
                    device_count = status.device_count,
                    "registered device"
                );
            }
            RegisterOutcome::AlreadyRegistered => {
                tracing::debug!(
                    license_ref = %license_ref,
                    device_id = %device.id(),
                    "device already registered"
                );
            }
        }

        let status = self.assemble(&mut *tx, status).await?;
        tx.commit().await?;
        Ok(status)
    }

    /// Extend a loan to `end`, or by the configured renewal period. The
    /// device must be active on the license.
    pub async fn renew(
        &self,
        license_ref: &str,
        device: &Device,
        end: Option<Timestamp>,
    ) -> Result<LicenseStatus, StoreError> {
        self.renew_at(license_ref, device, end, Timestamp::now()).await
    }

    pub async fn renew_at(
        &self,
        license_ref: &str,
        device: &Device,
        end: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<LicenseStatus, StoreError> {
        if !self.settings.links.renew {
            return Err(StoreError::ActionDisabled("renew"));
        }
        let request = RenewRequest {
            end,
            renew_days: self.settings.renew_days,
        };

        let _guard = self.locks.lock(license_ref).await;
        let mut tx = self.pool.begin().await?;
        let mut status = license_status::get_by_license_ref(&mut *tx, license_ref).await?;
        let active = device_is_active(&mut *tx, status.id, device).await?;
        let event = status.renew(device, active, &request, now)?;
        license_status::update(&mut *tx, &status).await?;
        events::add(&mut *tx, &event).await?;

        tracing::info!(
            license_ref = %license_ref,
            device_id = %device.id(),
            end = ?status.potential_end(),
            "renewed license"
        );
        let status = self.assemble(&mut *tx, status).await?;
        tx.commit().await?;
        Ok(status)
    }

    /// Return a license from a device. An active license is only returned
    /// by a device that is active on it.
    pub async fn return_license(
        &self,
        license_ref: &str,
        device: &Device,
    ) -> Result<LicenseStatus, StoreError> {
        self.return_license_at(license_ref, device, Timestamp::now())
            .await
    }

    pub async fn return_license_at(
        &self,
        license_ref: &str,
        device: &Device,
        now: Timestamp,
    ) -> Result<LicenseStatus, StoreError> {
        if !self.settings.links.return_ {
            return Err(StoreError::ActionDisabled("return"));
        }
        let _guard = self.locks.lock(license_ref).await;
        let mut tx = self.pool.begin().await?;
        let mut status = license_status::get_by_license_ref(&mut *tx, license_ref).await?;
        let active = device_is_active(&mut *tx, status.id, device).await?;
        let event = status.return_license(device, active, now)?;
        license_status::update(&mut *tx, &status).await?;
        events::add(&mut *tx, &event).await?;

        tracing::info!(
            license_ref = %license_ref,
            device_id = %device.id(),
            status = ?status.status,
            "returned license"
        );
        let status = self.assemble(&mut *tx, status).await?;
        tx.commit().await?;
        Ok(status)
    }

    // ─── Administrative transitions ──────────────────────────────────

    /// Withdraw a license.
    pub async fn revoke(&self, license_ref: &str) -> Result<LicenseStatus, StoreError> {
        self.administrative(license_ref, Timestamp::now(), LicenseStatus::revoke)
            .await
    }

    /// Withdraw a license that was never used.
    pub async fn cancel(&self, license_ref: &str) -> Result<LicenseStatus, StoreError> {
        self.administrative(license_ref, Timestamp::now(), LicenseStatus::cancel)
            .await
    }

    /// Expire one license if its rights end has passed. Returns whether
    /// the status changed.
    pub async fn expire_if_due(
        &self,
        license_ref: &str,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        let _guard = self.locks.lock(license_ref).await;
        let mut tx = self.pool.begin().await?;
        let mut status = license_status::get_by_license_ref(&mut *tx, license_ref).await?;
        let expired = status.expire_if_due(now);
        if expired {
            license_status::update(&mut *tx, &status).await?;
            tracing::info!(license_ref = %license_ref, "license expired");
        }
        tx.commit().await?;
        Ok(expired)
    }

    /// Expire every license whose rights end has passed. Returns the number
    /// of licenses expired.
    pub async fn expire_overdue(&self, now: Timestamp) -> Result<usize, StoreError> {
        let candidates: Vec<String> = license_status::list(&self.pool)
            .try_filter_map(|s| async move {
                let live = matches!(s.status, Some(Status::Ready | Status::Active));
                let due = s.potential_end().is_some_and(|end| end < now);
                Ok((live && due).then_some(s.license_ref))
            })
            .try_collect()
            .await?;

        let mut expired = 0;
        for license_ref in candidates {
            if self.expire_if_due(&license_ref, now).await? {
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn administrative<F>(
        &self,
        license_ref: &str,
        now: Timestamp,
        transition: F,
    ) -> Result<LicenseStatus, StoreError>
    where
        F: FnOnce(&mut LicenseStatus, Timestamp) -> Result<(), StateError>,
    {
        let _guard = self.locks.lock(license_ref).await;
        let mut tx = self.pool.begin().await?;
        let mut status = license_status::get_by_license_ref(&mut *tx, license_ref).await?;
        transition(&mut status, now)?;
        license_status::update(&mut *tx, &status).await?;

        tracing::info!(
            license_ref = %license_ref,
            status = ?status.status,
            "administrative status change"
        );
        let status = self.assemble(&mut *tx, status).await?;
        tx.commit().await?;
        Ok(status)
    }

    /// Attach events and links to a status for the document view.
    async fn assemble(
        &self,
        conn: &mut SqliteConnection,
        mut status: LicenseStatus,
    ) -> Result<LicenseStatus, StoreError> {
        status.events = events::list_by_owner(&mut *conn, status.id)
            .try_collect()
            .await?;
        status.fill_links(&self.settings.links);
        Ok(status)
    }
}

/// Whether the device's latest event on the license is a register or renew.
async fn device_is_active(
    conn: &mut SqliteConnection,
    status_id: i64,
    device: &Device,
) -> Result<bool, StoreError> {
    let latest = events::latest_device_event(conn, status_id, device.id()).await?;
    Ok(matches!(latest, Some(EventType::Register | EventType::Renew)))
}

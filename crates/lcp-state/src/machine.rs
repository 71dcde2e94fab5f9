//! # Status Transitions
//!
//! Transition methods on [`LicenseStatus`]. Each one checks the current
//! state, applies its effects to the record, and (for device transitions)
//! returns the single [`NewEvent`] that must be appended alongside the
//! status update.
//!
//! ## Terminal states
//!
//! `returned`, `revoked`, `cancelled` and `expired` accept no transition.
//! Any attempt fails with [`StateError::TerminalState`].

use lcp_core::Timestamp;

use crate::document::LicenseStatus;
use crate::error::StateError;
use crate::event::{Device, EventType, NewEvent};
use crate::status::Status;

// ─── Transition inputs and outcomes ──────────────────────────────────

/// Result of a register request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The device was new. Append this event.
    Registered(NewEvent),
    /// The device was registered before. Nothing changed.
    AlreadyRegistered,
}

/// A renewal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewRequest {
    /// Explicit new end. When absent, the current end plus `renew_days`.
    pub end: Option<Timestamp>,
    /// Default extension in days.
    pub renew_days: i64,
}

// ─── Transitions ─────────────────────────────────────────────────────

impl LicenseStatus {
    /// Register a device (READY or ACTIVE → ACTIVE).
    ///
    /// `already_registered` comes from the event log. A device that
    /// registered before leaves the record untouched.
    pub fn register(
        &mut self,
        device: &Device,
        already_registered: bool,
        now: Timestamp,
    ) -> Result<RegisterOutcome, StateError> {
        self.require_state(&[Status::Ready, Status::Active], Status::Active)?;
        if already_registered {
            return Ok(RegisterOutcome::AlreadyRegistered);
        }
        self.status = Some(Status::Active);
        self.device_count += 1;
        self.updated.license = Some(now);
        Ok(RegisterOutcome::Registered(NewEvent::new(
            EventType::Register,
            device,
            self.id,
            now,
        )))
    }

    /// Extend the rights window (ACTIVE → ACTIVE).
    ///
    /// `device_active` comes from the event log: the device's latest event
    /// is a register or renew. The new end must lie in the future and after
    /// the current end.
    pub fn renew(
        &mut self,
        device: &Device,
        device_active: bool,
        request: &RenewRequest,
        now: Timestamp,
    ) -> Result<NewEvent, StateError> {
        self.require_state(&[Status::Active], Status::Active)?;
        require_active_device(device, device_active)?;

        let current_end = self.potential_end();
        let new_end = match request.end {
            Some(end) => end,
            None => {
                if request.renew_days <= 0 {
                    return Err(StateError::InvalidRenewal(
                        "no end requested and no renewal period configured".to_string(),
                    ));
                }
                let base = current_end.ok_or_else(|| {
                    StateError::InvalidRenewal("license has no rights end to extend".to_string())
                })?;
                base.checked_add_days(request.renew_days).ok_or_else(|| {
                    StateError::InvalidRenewal("renewal period overflows".to_string())
                })?
            }
        };

        if new_end <= now {
            return Err(StateError::InvalidRenewal(format!(
                "requested end {new_end} is not in the future"
            )));
        }
        if let Some(current) = current_end {
            if new_end <= current {
                return Err(StateError::InvalidRenewal(format!(
                    "requested end {new_end} is not after current end {current}"
                )));
            }
        }

        self.set_potential_end(new_end);
        self.updated.license = Some(now);
        self.updated.status = Some(now);
        Ok(NewEvent::new(EventType::Renew, device, self.id, now))
    }

    /// Return the license (ACTIVE → RETURNED, READY → CANCELLED).
    ///
    /// An ACTIVE license is only returned by a device that is active on it.
    /// A READY license has no registered device yet.
    pub fn return_license(
        &mut self,
        device: &Device,
        device_active: bool,
        now: Timestamp,
    ) -> Result<NewEvent, StateError> {
        let current = self.require_state(&[Status::Ready, Status::Active], Status::Returned)?;
        let next = if current == Status::Ready {
            Status::Cancelled
        } else {
            require_active_device(device, device_active)?;
            Status::Returned
        };
        self.status = Some(next);
        self.updated.status = Some(now);
        Ok(NewEvent::new(EventType::Return, device, self.id, now))
    }

    /// Withdraw the license (READY or ACTIVE → REVOKED).
    pub fn revoke(&mut self, now: Timestamp) -> Result<(), StateError> {
        self.require_state(&[Status::Ready, Status::Active], Status::Revoked)?;
        self.administrative(Status::Revoked, now);
        Ok(())
    }

    /// Withdraw before first use (READY → CANCELLED).
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), StateError> {
        self.require_state(&[Status::Ready], Status::Cancelled)?;
        self.administrative(Status::Cancelled, now);
        Ok(())
    }

    /// Expire a READY or ACTIVE license whose rights end has passed.
    ///
    /// Returns whether the status changed. Terminal or undecodable records
    /// and licenses without an end are left alone.
    pub fn expire_if_due(&mut self, now: Timestamp) -> bool {
        let due = matches!(self.status, Some(Status::Ready | Status::Active))
            && self.potential_end().is_some_and(|end| end < now);
        if due {
            self.status = Some(Status::Expired);
            self.updated.status = Some(now);
        }
        due
    }

    /// Whether the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }

    /// Validate that the current state is one of `allowed`.
    fn require_state(&self, allowed: &[Status], target: Status) -> Result<Status, StateError> {
        let current = self.status.ok_or_else(|| StateError::UndecodableStatus {
            license_ref: self.license_ref.clone(),
        })?;
        if current.is_terminal() {
            return Err(StateError::TerminalState {
                state: current.to_string(),
            });
        }
        if !allowed.contains(&current) {
            return Err(StateError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }
        Ok(current)
    }

    fn administrative(&mut self, to: Status, now: Timestamp) {
        self.status = Some(to);
        self.updated.license = Some(now);
        self.updated.status = Some(now);
    }
}

fn require_active_device(device: &Device, active: bool) -> Result<(), StateError> {
    if active {
        Ok(())
    } else {
        Err(StateError::InvalidDevice(format!(
            "device {} is not active on this license",
            device.id()
        )))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

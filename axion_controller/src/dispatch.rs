//! Command issue and completion.
//!
//! Issuing a command performs its state check and side effect once and
//! returns immediately. Whether the machine has actually reached the target
//! condition is a separate predicate the caller polls, possibly over many
//! cycles (an interlock confirmation takes real time).
//!
//! Aggregate commands try every axis in index order and succeed only if all
//! of them did. A failing axis never stops the remaining ones from being
//! tried.

use crate::controller::{ManipulatorController, park};
use crate::error::CommandError;
use axion_common::prelude::*;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

impl ManipulatorController {
    // ─── Generic Surface ────────────────────────────────────────────

    /// Issue `command`.
    pub fn execute(&self, command: Command) -> Result<(), CommandError> {
        let result = match command {
            Command::StartAxis(axis) => self.axis_op(axis, |a| a.start()),
            Command::StopAxis(axis) => self.axis_op(axis, |a| a.stop()),
            Command::LockAxis(axis) => self.axis_op(axis, |a| a.lock()),
            Command::UnlockAxis(axis) => self.unlock(axis),
            Command::StartAllAxes => self.for_all(|axis| self.axis_op(axis, |a| a.start())),
            Command::StopAllAxes => self.for_all(|axis| self.axis_op(axis, |a| a.stop())),
            Command::LockAllAxes => self.for_all(|axis| self.axis_op(axis, |a| a.lock())),
            Command::UnlockAllAxes => self.for_all(|axis| self.unlock(axis)),
            Command::PrepareForUse => self.prepare(),
            Command::PrepareForShutdown => self.release(),
            Command::AddDriveOffset(axis, offset) => self.offset(axis, offset),
        };
        if let Err(e) = &result {
            error!(controller = %self.name, %command, error = %e, "Command failed");
        }
        result
    }

    /// Whether `command` has reached its target condition. Never changes
    /// state.
    pub fn is_completed(&self, command: Command) -> bool {
        match command {
            Command::StartAxis(axis) => self.query(axis, |a| a.is_driven()),
            Command::StopAxis(axis) => self.query(axis, |a| a.is_stopped()),
            Command::LockAxis(axis) => self.query(axis, |a| a.is_locked()),
            Command::UnlockAxis(axis) => self.query(axis, |a| !a.is_locked()),
            Command::StartAllAxes => self.all(|a| a.is_driven()),
            Command::StopAllAxes => self.all(|a| a.is_stopped()),
            Command::LockAllAxes => self.all(|a| a.is_locked()),
            Command::UnlockAllAxes => self.all(|a| !a.is_locked()),
            Command::PrepareForUse => self.interlock_confirmed(),
            Command::PrepareForShutdown | Command::AddDriveOffset(..) => true,
        }
    }

    // ─── Named Commands ─────────────────────────────────────────────

    /// Stopped → Driven.
    pub fn start_axis(&self, axis: usize) -> bool {
        self.execute(Command::StartAxis(axis)).is_ok()
    }

    /// Driven → Stopped; also succeeds on a stopped axis.
    pub fn stop_axis(&self, axis: usize) -> bool {
        self.execute(Command::StopAxis(axis)).is_ok()
    }

    /// Stopped → Locked.
    pub fn lock_axis(&self, axis: usize) -> bool {
        self.execute(Command::LockAxis(axis)).is_ok()
    }

    /// Locked → Stopped, only after [`prepare_for_use`](Self::prepare_for_use).
    pub fn unlock_axis(&self, axis: usize) -> bool {
        self.execute(Command::UnlockAxis(axis)).is_ok()
    }

    /// Start every axis.
    pub fn start_all_axes(&self) -> bool {
        self.execute(Command::StartAllAxes).is_ok()
    }

    /// Stop every axis.
    pub fn stop_all_axes(&self) -> bool {
        self.execute(Command::StopAllAxes).is_ok()
    }

    /// Lock every axis.
    pub fn lock_all_axes(&self) -> bool {
        self.execute(Command::LockAllAxes).is_ok()
    }

    /// Unlock every axis.
    pub fn unlock_all_axes(&self) -> bool {
        self.execute(Command::UnlockAllAxes).is_ok()
    }

    /// Close the interlock relays and allow unlocking.
    pub fn prepare_for_use(&self) -> bool {
        self.execute(Command::PrepareForUse).is_ok()
    }

    /// Stop and lock everything, open the interlock relays.
    pub fn prepare_for_shutdown(&self) -> bool {
        self.execute(Command::PrepareForShutdown).is_ok()
    }

    /// Accumulate `offset` into the drive offset of `axis`.
    pub fn add_drive_offset(&self, axis: usize, offset: f64) -> bool {
        self.execute(Command::AddDriveOffset(axis, offset)).is_ok()
    }

    // ─── Completion Predicates ──────────────────────────────────────

    /// Axis is driven.
    pub fn start_axis_completed(&self, axis: usize) -> bool {
        self.is_completed(Command::StartAxis(axis))
    }

    /// Axis is stopped.
    pub fn stop_axis_completed(&self, axis: usize) -> bool {
        self.is_completed(Command::StopAxis(axis))
    }

    /// Axis is locked.
    pub fn lock_axis_completed(&self, axis: usize) -> bool {
        self.is_completed(Command::LockAxis(axis))
    }

    /// Axis is no longer locked.
    pub fn unlock_axis_completed(&self, axis: usize) -> bool {
        self.is_completed(Command::UnlockAxis(axis))
    }

    /// Every axis is driven.
    pub fn start_all_axes_completed(&self) -> bool {
        self.is_completed(Command::StartAllAxes)
    }

    /// Every axis is stopped.
    pub fn stop_all_axes_completed(&self) -> bool {
        self.is_completed(Command::StopAllAxes)
    }

    /// Every axis is locked.
    pub fn lock_all_axes_completed(&self) -> bool {
        self.is_completed(Command::LockAllAxes)
    }

    /// No axis is locked.
    pub fn unlock_all_axes_completed(&self) -> bool {
        self.is_completed(Command::UnlockAllAxes)
    }

    /// Both interlock confirmations are on. Always true in simulation.
    pub fn prepare_for_use_completed(&self) -> bool {
        self.is_completed(Command::PrepareForUse)
    }

    /// Always true.
    pub fn prepare_for_shutdown_completed(&self) -> bool {
        self.is_completed(Command::PrepareForShutdown)
    }

    /// Always true.
    pub fn add_drive_offset_completed(&self, axis: usize) -> bool {
        self.is_completed(Command::AddDriveOffset(axis, 0.0))
    }

    // ─── Lifecycle Queries ──────────────────────────────────────────

    /// Lifecycle state of `axis`.
    pub fn lifecycle(&self, axis: usize) -> Option<AxisLifecycle> {
        self.with_axis(axis, |a| a.lifecycle())
    }

    /// `axis` exists and is locked.
    pub fn is_locked(&self, axis: usize) -> bool {
        self.query(axis, |a| a.is_locked())
    }

    /// `axis` exists and is stopped.
    pub fn is_stopped(&self, axis: usize) -> bool {
        self.query(axis, |a| a.is_stopped())
    }

    /// `axis` exists and is driven.
    pub fn is_driven(&self, axis: usize) -> bool {
        self.query(axis, |a| a.is_driven())
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn axis_op(
        &self,
        axis: usize,
        op: impl FnOnce(&mut dyn Axis) -> Result<(), HalError>,
    ) -> Result<(), CommandError> {
        self.with_axis(axis, op)
            .ok_or(CommandError::InvalidAxis {
                axis,
                count: self.axis_count(),
            })?
            .map_err(|e| CommandError::from_axis(axis, e))
    }

    fn for_all(&self, op: impl Fn(usize) -> Result<(), CommandError>) -> Result<(), CommandError> {
        let failed: Vec<usize> = (0..self.axis_count())
            .filter(|&axis| match op(axis) {
                Ok(()) => false,
                Err(e) => {
                    error!(axis, error = %e, "Axis failed in aggregate command");
                    true
                }
            })
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(CommandError::Aggregate { failed })
        }
    }

    fn query(&self, axis: usize, predicate: impl FnOnce(&dyn Axis) -> bool) -> bool {
        self.with_axis(axis, |a| predicate(a)).unwrap_or(false)
    }

    fn all(&self, predicate: impl Fn(&dyn Axis) -> bool) -> bool {
        self.slots.iter().all(|slot| predicate(&**slot.axis.lock()))
    }

    fn unlock(&self, axis: usize) -> Result<(), CommandError> {
        if axis >= self.axis_count() {
            return Err(CommandError::InvalidAxis {
                axis,
                count: self.axis_count(),
            });
        }
        if !self.is_activated() {
            return Err(CommandError::NotPrepared { axis });
        }
        self.axis_op(axis, |a| a.unlock())
    }

    fn prepare(&self) -> Result<(), CommandError> {
        self.set_interlock(true).map_err(CommandError::Interlock)?;
        if !self.simulation() {
            warn!(controller = %self.name, "Release the emergency stop to confirm the interlock");
        }
        self.activated.store(true, Ordering::Release);
        info!(controller = %self.name, "Prepared for use");
        Ok(())
    }

    fn release(&self) -> Result<(), CommandError> {
        let axes = self.for_all(|axis| self.axis_op(axis, park));
        let relays = self.set_interlock(false).map_err(CommandError::Interlock);
        self.activated.store(false, Ordering::Release);
        info!(controller = %self.name, "Prepared for shutdown");
        axes.and(relays)
    }

    fn offset(&self, axis: usize, offset: f64) -> Result<(), CommandError> {
        let slot = self.slots.get(axis).ok_or(CommandError::InvalidAxis {
            axis,
            count: self.axis_count(),
        })?;
        let total = slot.drive_offset.add(offset);
        info!(axis, offset, total, "Drive offset adjusted");
        Ok(())
    }

    fn interlock_confirmed(&self) -> bool {
        let Some(io) = &self.io else {
            return true;
        };
        self.layout
            .interlock_inputs
            .iter()
            .all(|&channel| match io.read_digital(channel) {
                Ok(on) => on,
                Err(e) => {
                    warn!(channel, error = %e, "Interlock input unreadable");
                    false
                }
            })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

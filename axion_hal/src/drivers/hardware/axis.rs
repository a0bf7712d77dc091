//! Axis backed by an encoder, a tachometer, a current shunt and an analog
//! drive amplifier with enable and brake relays.

use super::channels::AxisChannels;
use axion_common::control_unit::config::{AxisLimits, IoLayout};
use axion_common::hal::axis::{Axis, AxisVariant, DriveOutcome, SensorKind};
use axion_common::hal::calibration::CalibrationEntry;
use axion_common::hal::error::HalError;
use axion_common::hal::io::IoBackend;
use axion_common::hal::lifecycle::{AxisLifecycle, LifecycleEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Joint wired to I/O boards.
pub struct HardwareAxis {
    index: usize,
    calibration: CalibrationEntry,
    channels: AxisChannels,
    io: Arc<dyn IoBackend>,
    /// Symmetric clamp applied to drive commands, in command units.
    drive_limit: f64,
    lifecycle: AxisLifecycle,
}

impl HardwareAxis {
    /// Build a locked axis.
    ///
    /// Writes the safe output state (drive disabled, brake engaged, zero
    /// reference). Torque-controlled axes also switch their mode relay.
    pub fn new(
        index: usize,
        calibration: CalibrationEntry,
        limits: &AxisLimits,
        io: Arc<dyn IoBackend>,
        layout: &IoLayout,
    ) -> Result<Self, HalError> {
        let channels = AxisChannels::resolve(layout, index);
        let drive_limit = if calibration.torque_controlled {
            limits.current_limit
        } else {
            limits.velocity_limit
        };

        let axis = Self {
            index,
            calibration,
            channels,
            io,
            drive_limit,
            lifecycle: AxisLifecycle::Locked,
        };

        let init = |e: HalError| HalError::InitFailed(format!("axis {index}: {e}"));
        axis.write_neutral().map_err(init)?;
        axis.io.write_digital(channels.enable, false).map_err(init)?;
        axis.io.write_digital(channels.brake, true).map_err(init)?;
        if calibration.torque_controlled {
            axis.io.write_digital(channels.mode, true).map_err(init)?;
        }

        debug!(
            axis = index,
            io = axis.io.name(),
            torque = calibration.torque_controlled,
            drive_limit,
            "Hardware axis ready"
        );
        Ok(axis)
    }

    /// Channel numbers used by this axis.
    pub fn channels(&self) -> &AxisChannels {
        &self.channels
    }

    fn write_neutral(&self) -> Result<(), HalError> {
        self.io.write_analog(self.channels.drive, 0.0)
    }

    /// Validate `event`, perform `outputs`, then commit the new state.
    fn transition(
        &mut self,
        event: LifecycleEvent,
        outputs: impl FnOnce(&Self) -> Result<(), HalError>,
    ) -> Result<(), HalError> {
        let next = self.lifecycle.on(event)?;
        outputs(self)?;
        if next != self.lifecycle {
            info!(axis = self.index, from = %self.lifecycle, to = %next, "Axis {event}");
        }
        self.lifecycle = next;
        Ok(())
    }

    fn read(&self, kind: SensorKind) -> Result<Option<f64>, HalError> {
        let cal = &self.calibration;
        Ok(Some(match kind {
            SensorKind::Position => cal.position_from_ticks(self.io.read_encoder(self.channels.encoder)?),
            SensorKind::Velocity => cal.velocity_from_volts(self.io.read_analog(self.channels.tacho)?),
            SensorKind::Current => cal.current_from_volts(self.io.read_analog(self.channels.current)?),
        }))
    }
}

impl Axis for HardwareAxis {
    fn lifecycle(&self) -> AxisLifecycle {
        self.lifecycle
    }

    fn unlock(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Unlock, |axis| {
            axis.io.write_digital(axis.channels.brake, false)?;
            axis.io.write_digital(axis.channels.enable, true)
        })
    }

    fn lock(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Lock, |axis| {
            axis.write_neutral()?;
            axis.io.write_digital(axis.channels.enable, false)?;
            axis.io.write_digital(axis.channels.brake, true)
        })
    }

    fn start(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Start, Self::write_neutral)
    }

    fn stop(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Stop, Self::write_neutral)
    }

    fn drive(&mut self, value: f64) -> DriveOutcome {
        if !self.lifecycle.allows_drive() {
            return DriveOutcome::Rejected;
        }
        let command = value.clamp(-self.drive_limit, self.drive_limit);
        if let Err(e) = self
            .io
            .write_analog(self.channels.drive, self.calibration.drive_volts(command))
        {
            warn!(axis = self.index, error = %e, "Drive write failed");
            return DriveOutcome::Rejected;
        }
        if command == value {
            DriveOutcome::Applied
        } else {
            DriveOutcome::Clamped { requested: value }
        }
    }

    fn sensor(&mut self, kind: SensorKind) -> Option<f64> {
        self.read(kind).unwrap_or_else(|e| {
            warn!(axis = self.index, sensor = %kind, error = %e, "Sensor read failed");
            None
        })
    }

    fn torque_controlled(&self) -> bool {
        self.calibration.torque_controlled
    }

    fn variant(&self) -> AxisVariant {
        AxisVariant::Hardware
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

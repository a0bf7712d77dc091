//! Integrator axis.
//!
//! Torque-controlled: the drive command is a current, the joint follows the
//! plant acceleration (semi-implicit Euler). Velocity-controlled: the joint
//! moves at the commanded velocity and has no current sensor. Readings are
//! never clamped, so a simulated joint can leave its envelope just like a
//! real one.

use axion_common::control_unit::config::AxisLimits;
use axion_common::hal::axis::{Axis, AxisVariant, DriveOutcome, SensorKind};
use axion_common::hal::calibration::CalibrationEntry;
use axion_common::hal::error::HalError;
use axion_common::hal::lifecycle::{AxisLifecycle, LifecycleEvent};
use std::time::Duration;
use tracing::{debug, trace};

/// Simulated joint.
#[derive(Debug, Clone)]
pub struct SimulatedAxis {
    index: usize,
    calibration: CalibrationEntry,
    /// Integration step, seconds.
    dt: f64,
    lifecycle: AxisLifecycle,
    position: f64,
    velocity: f64,
    acceleration: f64,
    /// Acceleration handed over by the plant for the next drive.
    plant_acceleration: f64,
    command: f64,
}

impl SimulatedAxis {
    /// Locked joint at the configured initial position.
    pub fn new(index: usize, calibration: &CalibrationEntry, limits: &AxisLimits, cycle_time: Duration) -> Self {
        debug!(
            axis = index,
            torque = calibration.torque_controlled,
            initial_position = limits.initial_position,
            "Simulated axis ready"
        );
        Self {
            index,
            calibration: *calibration,
            dt: cycle_time.as_secs_f64(),
            lifecycle: AxisLifecycle::Locked,
            position: limits.initial_position,
            velocity: 0.0,
            acceleration: 0.0,
            plant_acceleration: 0.0,
            command: 0.0,
        }
    }

    /// Integrated joint angle.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Integrated joint speed.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Acceleration applied in the last drive.
    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Last accepted drive command.
    pub fn command(&self) -> f64 {
        self.command
    }

    fn halt(&mut self) {
        self.velocity = 0.0;
        self.acceleration = 0.0;
        self.plant_acceleration = 0.0;
        self.command = 0.0;
    }

    fn transition(&mut self, event: LifecycleEvent) -> Result<(), HalError> {
        let next = self.lifecycle.on(event)?;
        if matches!(event, LifecycleEvent::Stop | LifecycleEvent::Lock | LifecycleEvent::Start) {
            self.halt();
        }
        if next != self.lifecycle {
            debug!(axis = self.index, from = %self.lifecycle, to = %next, "Simulated axis {event}");
        }
        self.lifecycle = next;
        Ok(())
    }
}

impl Axis for SimulatedAxis {
    fn lifecycle(&self) -> AxisLifecycle {
        self.lifecycle
    }

    fn unlock(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Unlock)
    }

    fn lock(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Lock)
    }

    fn start(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Start)
    }

    fn stop(&mut self) -> Result<(), HalError> {
        self.transition(LifecycleEvent::Stop)
    }

    fn drive(&mut self, value: f64) -> DriveOutcome {
        if !self.lifecycle.allows_drive() {
            return DriveOutcome::Rejected;
        }
        self.command = value;
        if self.calibration.torque_controlled {
            self.acceleration = self.plant_acceleration;
            self.velocity += self.acceleration * self.dt;
        } else {
            self.acceleration = 0.0;
            self.velocity = value;
        }
        self.position += self.velocity * self.dt;
        trace!(
            axis = self.index,
            command = value,
            position = self.position,
            velocity = self.velocity,
            "Simulated drive"
        );
        DriveOutcome::Applied
    }

    fn apply_plant_acceleration(&mut self, acceleration: f64) {
        self.plant_acceleration = acceleration;
    }

    fn sensor(&mut self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Position => Some(self.position),
            SensorKind::Velocity => Some(self.velocity),
            SensorKind::Current if self.calibration.torque_controlled => {
                let volts = self.command * self.calibration.shunt_resistance;
                Some(self.calibration.regulated_current(volts))
            }
            SensorKind::Current => None,
        }
    }

    fn torque_controlled(&self) -> bool {
        self.calibration.torque_controlled
    }

    fn variant(&self) -> AxisVariant {
        AxisVariant::Simulated
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

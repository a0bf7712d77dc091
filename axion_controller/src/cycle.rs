//! The periodic entry point.
//!
//! One call to [`ManipulatorController::update`] is one control cycle:
//!
//! 1. Plant phase (simulated axes only): gather position, velocity and the
//!    torque input of every axis, then evaluate the plant model once so all
//!    accelerations come from the same state vector.
//! 2. Axis phase, in index order: publish position and velocity, check
//!    them, publish and check the current of torque-controlled axes, then
//!    drive the axis if it is driven. A command the axis had to clamp counts
//!    as a current (torque axes) or velocity violation.
//! 3. Deliver the notifications raised on the way.
//!
//! Each axis is locked only for its own step. Nothing in a cycle allocates.

use crate::controller::ManipulatorController;
use crate::ports::ValuePort;
use crate::safety::{check_current, check_drive, check_position, check_velocity};
use axion_common::consts::MAX_AXES;
use axion_common::prelude::*;
use axion_common::control_unit::event::OutOfRange;
use tracing::trace;

/// Upper bound on violations in one cycle: three sensor checks and one drive
/// clamp per axis.
pub const MAX_VIOLATIONS: usize = MAX_AXES * 4;

/// Outcome of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Cycle number, starting at 1.
    pub cycle: u64,
    /// Axes that accepted a drive command.
    pub driven: usize,
    /// Violations in raise order.
    pub violations: heapless::Vec<Notification, MAX_VIOLATIONS>,
}

impl CycleReport {
    /// Violations found on `axis`.
    pub fn flags(&self, axis: usize) -> OutOfRange {
        self.violations
            .iter()
            .filter(|n| n.axis == axis)
            .fold(OutOfRange::empty(), |flags, n| flags | n.kind.flag())
    }

    /// Violations of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.violations.iter().filter(|n| n.kind == kind).count()
    }

    /// No envelope was violated.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Read `kind` into `port`. Keeps the last published value when the axis has
/// nothing to report.
#[inline]
fn publish(axis: &mut dyn Axis, kind: SensorKind, port: &ValuePort) -> f64 {
    match axis.sensor(kind) {
        Some(value) => {
            port.set(value);
            value
        }
        None => port.get(),
    }
}

impl ManipulatorController {
    /// Run one control cycle.
    pub fn update(&self) -> CycleReport {
        let mut state = self.cycle.lock();
        state.count += 1;
        let mut report = CycleReport {
            cycle: state.count,
            ..Default::default()
        };
        let n = self.slots.len();

        // ── Plant phase ──
        if let Some(plant) = &self.plant {
            let s = &mut state.scratch;
            for (i, slot) in self.slots.iter().enumerate() {
                let mut axis = slot.axis.lock();
                s.position[i] = axis
                    .sensor(SensorKind::Position)
                    .unwrap_or_else(|| slot.ports.position.get());
                s.velocity[i] = axis
                    .sensor(SensorKind::Velocity)
                    .unwrap_or_else(|| slot.ports.velocity.get());
                s.torque[i] = if slot.torque_controlled {
                    slot.ports.drive.get()
                } else {
                    0.0
                };
            }
            plant.forward(
                &s.torque[..n],
                &s.velocity[..n],
                &s.position[..n],
                &mut s.acceleration[..n],
            );
        }

        // ── Axis phase ──
        for (i, slot) in self.slots.iter().enumerate() {
            let mut guard = slot.axis.lock();
            let axis: &mut dyn Axis = &mut **guard;
            let ports = &slot.ports;

            let position = publish(axis, SensorKind::Position, &ports.position);
            let velocity = publish(axis, SensorKind::Velocity, &ports.velocity);
            let mut raised = [
                check_position(&slot.limits, i, position),
                check_velocity(&slot.limits, i, velocity),
                None,
            ];
            if slot.torque_controlled {
                let current = publish(axis, SensorKind::Current, &ports.torque);
                raised[2] = check_current(&slot.limits, i, current);
            }
            for event in raised.into_iter().flatten() {
                let _ = report.violations.push(event);
            }

            if axis.is_driven() {
                axis.apply_plant_acceleration(state.scratch.acceleration[i]);
                let command = ports.drive.get();
                let value = if slot.torque_controlled {
                    command
                } else {
                    command + slot.drive_offset.get()
                };
                let outcome = axis.drive(value);
                if outcome.accepted() {
                    report.driven += 1;
                }
                if let Some(event) = check_drive(i, slot.torque_controlled, outcome) {
                    // capacity covers four raises per axis
                    let _ = report.violations.push(event);
                }
            }
        }
        drop(state);

        for event in &report.violations {
            self.events.publish(*event);
        }
        trace!(
            cycle = report.cycle,
            driven = report.driven,
            violations = report.violations.len(),
            "Cycle complete"
        );
        report
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

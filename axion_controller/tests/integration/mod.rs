//! Shared builders for the integration tests.

mod hardware;
mod lifecycle;
mod persistence;
mod safety_events;
mod scenarios;

use axion_common::prelude::*;
use axion_controller::ManipulatorController;
use crossbeam_channel::Receiver;

/// Limits that nothing in a resting arm violates.
pub fn wide_limits() -> AxisLimits {
    AxisLimits {
        velocity_limit: 10.0,
        current_limit: 10.0,
        lower_position_limit: -10.0,
        upper_position_limit: 10.0,
        ..Default::default()
    }
}

/// Reference calibration entry `index`, switched to the given control mode.
pub fn entry(index: usize, torque_controlled: bool) -> CalibrationEntry {
    CalibrationEntry {
        torque_controlled,
        ..*CalibrationTable::reference().get(index).unwrap()
    }
}

/// Simulated controller with one axis per `(entry, limits)` pair.
pub fn simulated(axes: Vec<(CalibrationEntry, AxisLimits)>) -> ManipulatorController {
    let (entries, limits): (Vec<_>, Vec<_>) = axes.into_iter().unzip();
    ManipulatorController::builder("arm")
        .config(ControllerConfig {
            axes: limits,
            ..Default::default()
        })
        .calibration(CalibrationTable::new(entries).unwrap())
        .build()
        .unwrap()
}

/// Simulated reference arm with wide limits on every axis.
pub fn reference_arm() -> ManipulatorController {
    simulated((0..6).map(|i| (entry(i, true), wide_limits())).collect())
}

/// Prepare for use, unlock and start `axis`.
pub fn enable(controller: &ManipulatorController, axis: usize) {
    assert!(controller.prepare_for_use());
    assert!(controller.unlock_axis(axis));
    assert!(controller.start_axis(axis));
}

/// Everything queued on `rx` right now.
pub fn drain(rx: &Receiver<Notification>) -> Vec<Notification> {
    rx.try_iter().collect()
}

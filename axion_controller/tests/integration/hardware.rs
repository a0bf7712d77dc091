//! Integration test: hardware axes over the loopback backend.
//!
//! Validates the I/O side of the controller:
//! 1. Interlock relays and their delayed confirmation
//! 2. Brake, enable and drive outputs per lifecycle state
//! 3. Raw sensor values converted through the calibration table
//! 4. Safe outputs when the controller goes away

use axion_common::prelude::*;
use axion_controller::ManipulatorController;
use axion_hal::LoopbackIo;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const INTERLOCK_DELAY: Duration = Duration::from_millis(30);

// ── Helpers ─────────────────────────────────────────────────────────

fn hardware_limits() -> AxisLimits {
    AxisLimits {
        velocity_limit: 2.0,
        current_limit: 5.0,
        lower_position_limit: -3.0,
        upper_position_limit: 3.0,
        ..Default::default()
    }
}

fn hardware_arm(delay: Duration) -> (ManipulatorController, Arc<LoopbackIo>, IoLayout) {
    hardware_arm_with(CalibrationTable::reference(), delay)
}

fn hardware_arm_with(
    calibration: CalibrationTable,
    delay: Duration,
) -> (ManipulatorController, Arc<LoopbackIo>, IoLayout) {
    let layout = IoLayout::default();
    let io = Arc::new(LoopbackIo::for_arm(&layout, &calibration, delay));
    let controller = ManipulatorController::builder("arm")
        .config(ControllerConfig {
            simulation: false,
            axes: vec![hardware_limits(); 6],
            ..Default::default()
        })
        .calibration(calibration)
        .io(io.clone())
        .build()
        .unwrap();
    (controller, io, layout)
}

fn ready_arm() -> (ManipulatorController, Arc<LoopbackIo>, IoLayout) {
    let (c, io, layout) = hardware_arm(Duration::ZERO);
    assert!(c.prepare_for_use());
    (c, io, layout)
}

fn reference(axis: usize) -> CalibrationEntry {
    *CalibrationTable::reference().get(axis).unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn interlock_confirms_after_relay_delay() {
    let (c, io, layout) = hardware_arm(INTERLOCK_DELAY);
    assert_eq!(c.variant(), AxisVariant::Hardware);
    assert!(!c.prepare_for_use_completed());

    assert!(c.prepare_for_use());
    for output in layout.interlock_outputs {
        assert!(io.digital_output(output).unwrap());
    }
    assert!(!c.prepare_for_use_completed());

    thread::sleep(INTERLOCK_DELAY * 3);
    assert!(c.prepare_for_use_completed());
}

#[test]
fn prepare_for_shutdown_opens_the_interlock() {
    let (c, io, layout) = ready_arm();
    c.unlock_axis(0);
    c.start_axis(0);

    assert!(c.prepare_for_shutdown());
    assert!(c.prepare_for_shutdown_completed());
    for output in layout.interlock_outputs {
        assert!(!io.digital_output(output).unwrap());
    }
    assert!(!c.prepare_for_use_completed());
}

#[test]
fn lifecycle_switches_brake_and_enable() {
    let (c, io, layout) = ready_arm();
    let brake = layout.brake_output(2);
    let enable = layout.enable_output(2);
    assert!(io.digital_output(brake).unwrap());
    assert!(!io.digital_output(enable).unwrap());

    assert!(c.unlock_axis(2));
    assert!(!io.digital_output(brake).unwrap());
    assert!(io.digital_output(enable).unwrap());

    assert!(c.lock_axis(2));
    assert!(io.digital_output(brake).unwrap());
    assert!(!io.digital_output(enable).unwrap());
}

#[test]
fn cycle_writes_clamped_drive_voltage() {
    let (c, io, layout) = ready_arm();
    let rx = c.subscribe();
    c.unlock_axis(0);
    c.start_axis(0);
    let r = reference(0).shunt_resistance;

    c.ports(0).unwrap().drive.set(2.0);
    let report = c.update();
    assert_eq!(report.driven, 1);
    assert!(report.is_clean());
    assert!((io.analog_output(layout.drive_output(0)).unwrap() - 2.0 * r).abs() < 1e-12);

    // torque axes clamp to the current limit and say so
    c.ports(0).unwrap().drive.set(-50.0);
    let report = c.update();
    assert_eq!(report.driven, 1);
    assert!((io.analog_output(layout.drive_output(0)).unwrap() + 5.0 * r).abs() < 1e-12);
    assert_eq!(report.flags(0), OutOfRange::CURRENT);
    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::CurrentOutOfRange);
    assert_eq!(events[0].value, -50.0);

    c.stop_axis(0);
    assert_eq!(io.analog_output(layout.drive_output(0)).unwrap(), 0.0);
}

#[test]
fn clamped_velocity_command_raises_velocity_event() {
    let mut entries: Vec<_> = CalibrationTable::reference().iter().copied().collect();
    entries[1].torque_controlled = false;
    let calibration = CalibrationTable::new(entries).unwrap();
    let v2v = calibration.get(1).unwrap().drive_to_volt;
    let (c, io, layout) = hardware_arm_with(calibration, Duration::ZERO);
    assert!(c.prepare_for_use());
    c.unlock_axis(1);
    c.start_axis(1);

    c.ports(1).unwrap().drive.set(3.0);
    let report = c.update();
    assert!((io.analog_output(layout.drive_output(1)).unwrap() - 2.0 * v2v).abs() < 1e-12);
    assert_eq!(report.flags(1), OutOfRange::VELOCITY);
    assert_eq!(report.count(EventKind::VelocityOutOfRange), 1);
    assert_eq!(report.count(EventKind::CurrentOutOfRange), 0);
}

#[test]
fn locked_axes_keep_zero_output() {
    let (c, io, layout) = ready_arm();
    for axis in 0..6 {
        c.ports(axis).unwrap().drive.set(1.0);
    }
    assert_eq!(c.update().driven, 0);
    for axis in 0..6 {
        assert_eq!(io.analog_output(layout.drive_output(axis)).unwrap(), 0.0);
    }
}

#[test]
fn sensors_are_converted_and_checked() {
    let (c, io, layout) = ready_arm();
    let rx = c.subscribe();
    let entry = reference(1);

    let ticks = entry.encoder_offset + 50_000;
    io.set_encoder(layout.encoder(1), ticks).unwrap();
    io.set_analog_input(layout.tacho_input(1), 0.05).unwrap();
    io.set_analog_input(layout.current_input(1), 1.0).unwrap();

    let report = c.update();
    let ports = c.ports(1).unwrap();
    assert!((ports.position.get() - entry.position_from_ticks(ticks)).abs() < 1e-12);
    assert!((ports.velocity.get() - entry.velocity_from_volts(0.05)).abs() < 1e-12);
    assert!((ports.torque.get() - entry.current_from_volts(1.0)).abs() < 1e-12);

    // 1 V over the shunt is above 5 A; position and speed are fine
    assert_eq!(report.flags(1), OutOfRange::CURRENT);
    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].axis, 1);
}

#[test]
fn encoder_past_the_envelope_raises_position_event() {
    let (c, io, layout) = ready_arm();
    let entry = reference(0);
    // four radians past zero
    let ticks = entry.encoder_offset + (4.0 / entry.ticks_to_radians) as i64;
    io.set_encoder(layout.encoder(0), ticks).unwrap();

    let report = c.update();
    assert_eq!(report.flags(0), OutOfRange::POSITION);
    assert!(c.is_locked(0));
}

#[test]
fn dropping_the_controller_engages_brakes() {
    let (c, io, layout) = ready_arm();
    assert!(c.unlock_all_axes());
    assert!(c.start_axis(0));
    assert!(c.start_axis(3));
    c.ports(0).unwrap().drive.set(1.0);
    c.update();
    assert!(io.analog_output(layout.drive_output(0)).unwrap() != 0.0);

    drop(c);
    for axis in 0..6 {
        assert!(io.digital_output(layout.brake_output(axis)).unwrap(), "axis {axis}");
        assert!(!io.digital_output(layout.enable_output(axis)).unwrap(), "axis {axis}");
        assert_eq!(io.analog_output(layout.drive_output(axis)).unwrap(), 0.0);
    }
}

#[test]
fn dropping_the_controller_opens_the_interlock() {
    let (c, io, layout) = ready_arm();
    assert!(c.unlock_axis(1));
    assert!(c.start_axis(1));
    for output in layout.interlock_outputs {
        assert!(io.digital_output(output).unwrap());
    }

    drop(c);
    for output in layout.interlock_outputs {
        assert!(!io.digital_output(output).unwrap(), "relay {output} left on");
    }
    assert!(io.digital_output(layout.brake_output(1)).unwrap());
}

#[test]
fn drop_after_shutdown_leaves_outputs_alone() {
    let (c, io, layout) = ready_arm();
    c.shutdown().unwrap();
    // re-energize by hand; a controller already shut down must not touch it
    io.write_digital(layout.interlock_outputs[0], true).unwrap();

    drop(c);
    assert!(io.digital_output(layout.interlock_outputs[0]).unwrap());
}

#[test]
fn shutdown_releases_relays_and_locks() {
    let (c, io, layout) = ready_arm();
    c.unlock_all_axes();
    c.start_all_axes();

    c.shutdown().unwrap();
    assert!(!c.is_activated());
    assert!((0..6).all(|i| c.is_locked(i)));
    for output in layout.interlock_outputs {
        assert!(!io.digital_output(output).unwrap());
    }
}

#[test]
fn hardware_without_backend_falls_back_to_simulation() {
    let c = ManipulatorController::builder("arm")
        .config(ControllerConfig {
            simulation: false,
            axes: vec![hardware_limits(); 6],
            ..Default::default()
        })
        .build()
        .unwrap();
    assert_eq!(c.variant(), AxisVariant::Simulated);
    assert!(c.simulation());
}

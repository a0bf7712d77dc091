//! Integration test: multi-cycle scenarios on simulated arms.
//!
//! 1. A held arm stays inside its envelope
//! 2. Drive offsets shift velocity commands and survive a round trip
//! 3. Commands from another thread interleave safely with the cycle
//! 4. The registry and the runner drive a controller end to end

use axion_common::prelude::*;
use axion_controller::registry::MANIPULATOR_CONTROLLER;
use axion_controller::{
    Component, ComponentRegistry, CycleRunner, ManipulatorController, OverrunPolicy,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;

use super::{drain, enable, entry, reference_arm, simulated, wide_limits};

// ── Helpers ─────────────────────────────────────────────────────────

/// Two torque axes; axis 0 may only move within ±1 rad.
fn two_axis_arm() -> ManipulatorController {
    simulated(vec![
        (
            entry(0, true),
            AxisLimits {
                lower_position_limit: -1.0,
                upper_position_limit: 1.0,
                ..wide_limits()
            },
        ),
        (entry(1, true), wide_limits()),
    ])
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn zero_torque_holds_position_for_a_hundred_cycles() {
    let c = two_axis_arm();
    let rx = c.subscribe();
    enable(&c, 0);
    c.ports(0).unwrap().drive.set(0.0);

    for _ in 0..100 {
        let report = c.update();
        assert_eq!(report.driven, 1);
        assert_eq!(report.count(EventKind::PositionOutOfRange), 0);
        let position = c.ports(0).unwrap().position.get();
        assert!((-1.0..=1.0).contains(&position), "position {position}");
    }
    assert!(
        drain(&rx)
            .iter()
            .all(|e| e.kind != EventKind::PositionOutOfRange)
    );
    assert_eq!(c.cycle_count(), 100);
}

#[test]
fn stopped_axis_ignores_its_drive_input() {
    let c = two_axis_arm();
    c.prepare_for_use();
    c.unlock_axis(0);
    c.ports(0).unwrap().drive.set(5.0);

    for _ in 0..10 {
        assert_eq!(c.update().driven, 0);
    }
    assert_eq!(c.ports(0).unwrap().position.get(), 0.0);
    assert_eq!(c.ports(0).unwrap().velocity.get(), 0.0);
}

#[test]
fn offset_round_trip_restores_value() {
    let c = reference_arm();
    let before = c.drive_offset(2).unwrap();
    assert!(c.add_drive_offset(2, 0.375));
    assert!(c.add_drive_offset_completed(2));
    assert!((c.drive_offset(2).unwrap() - (before + 0.375)).abs() < 1e-12);
    assert!(c.add_drive_offset(2, -0.375));
    assert!((c.drive_offset(2).unwrap() - before).abs() < 1e-12);
}

#[test]
fn offset_shifts_velocity_commands() {
    let c = simulated(vec![(entry(0, false), wide_limits())]);
    enable(&c, 0);
    c.add_drive_offset(0, 0.5);
    c.ports(0).unwrap().drive.set(1.0);

    c.update();
    c.update();
    assert!((c.ports(0).unwrap().velocity.get() - 1.5).abs() < 1e-12);
}

#[test]
fn offset_leaves_torque_commands_alone() {
    let c = simulated(vec![(entry(0, true), wide_limits())]);
    enable(&c, 0);
    c.add_drive_offset(0, 3.0);
    c.ports(0).unwrap().drive.set(0.0);

    for _ in 0..20 {
        c.update();
    }
    assert_eq!(c.ports(0).unwrap().velocity.get(), 0.0);
}

#[test]
fn commands_interleave_with_running_cycle() {
    let c = Arc::new(reference_arm());
    c.prepare_for_use();
    c.unlock_all_axes();
    for axis in 0..6 {
        c.ports(axis).unwrap().drive.set(0.1);
    }

    let commander = {
        let c = c.clone();
        thread::spawn(move || {
            for round in 0..200 {
                let axis = round % 6;
                c.start_axis(axis);
                c.stop_axis(axis);
                c.start_axis(axis);
            }
        })
    };
    for _ in 0..500 {
        let report = c.update();
        assert!(report.driven <= 6);
    }
    commander.join().unwrap();

    c.stop_all_axes();
    assert!(c.lock_all_axes());
    assert!((0..6).all(|i| c.is_locked(i) && !c.is_driven(i)));
}

#[test]
fn registry_component_runs_under_cycle_runner() {
    let registry = ComponentRegistry::with_builtin();
    let component: Arc<dyn Component> = registry
        .create(MANIPULATOR_CONTROLLER, "arm", Path::new("/nonexistent/arm.toml"))
        .unwrap();
    component.startup().unwrap();
    component.execute(Command::PrepareForUse).unwrap();
    assert!(component.is_completed(Command::PrepareForUse));

    let running = Arc::new(AtomicBool::new(true));
    let mut runner = CycleRunner::new(component.clone(), running)
        .with_max_cycles(Some(5))
        .with_overrun_policy(OverrunPolicy::Count);
    runner.run().unwrap();
    assert_eq!(runner.stats().cycle_count, 5);
    assert_eq!(runner.stats().peak_driven, 0);

    component.shutdown().unwrap();
    assert!(component.is_completed(Command::LockAllAxes));
}

//! Integration test: envelope violations and their delivery.
//!
//! A violation is reported, never acted on: the axis keeps its lifecycle
//! state and keeps being driven.

use axion_common::prelude::*;
use axion_controller::ManipulatorController;

use super::{drain, enable, entry, reference_arm, simulated, wide_limits};

// ── Helpers ─────────────────────────────────────────────────────────

/// Velocity-controlled axis 0 limited to 2.0 rad/s, torque axis 1 at rest.
fn velocity_arm() -> ManipulatorController {
    simulated(vec![
        (
            entry(0, false),
            AxisLimits {
                velocity_limit: 2.0,
                ..wide_limits()
            },
        ),
        (entry(1, true), wide_limits()),
    ])
}

/// Torque-controlled axis 0 with a 5 A current limit.
fn current_arm() -> ManipulatorController {
    simulated(vec![
        (
            entry(0, true),
            AxisLimits {
                current_limit: 5.0,
                velocity_limit: 100.0,
                ..wide_limits()
            },
        ),
        (entry(1, true), wide_limits()),
    ])
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn overspeed_raises_exactly_one_velocity_event() {
    let c = velocity_arm();
    let rx = c.subscribe();
    enable(&c, 0);
    c.ports(0).unwrap().drive.set(2.5);

    // the first cycle publishes rest and then drives
    assert!(c.update().is_clean());
    assert!(drain(&rx).is_empty());

    let report = c.update();
    assert_eq!(report.count(EventKind::VelocityOutOfRange), 1);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.flags(0), OutOfRange::VELOCITY);
    assert!(c.is_driven(0));

    let events = drain(&rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::VelocityOutOfRange);
    assert_eq!(events[0].axis, 0);
    assert!((events[0].value - 2.5).abs() < 1e-12);
    assert_eq!(events[0].message, "Velocity of an axis is out of range");
}

#[test]
fn violation_repeats_every_cycle_it_persists() {
    let c = velocity_arm();
    let rx = c.subscribe();
    enable(&c, 0);
    c.ports(0).unwrap().drive.set(-3.0);

    c.update();
    for _ in 0..5 {
        assert_eq!(c.update().count(EventKind::VelocityOutOfRange), 1);
    }
    assert_eq!(drain(&rx).len(), 5);

    c.ports(0).unwrap().drive.set(1.0);
    c.update();
    assert!(c.update().is_clean());
    assert!(c.is_driven(0));
}

#[test]
fn overcurrent_publishes_measured_current() {
    let c = current_arm();
    let rx = c.subscribe();
    enable(&c, 0);
    c.ports(0).unwrap().drive.set(10.0);

    c.update();
    let cycles = 4;
    for _ in 0..cycles {
        let report = c.update();
        assert_eq!(report.count(EventKind::CurrentOutOfRange), 1);
        assert_eq!(report.flags(0), OutOfRange::CURRENT);
    }

    // the published torque is the regulated measurement, not the command
    let published = c.ports(0).unwrap().torque.get();
    let expected = entry(0, true).regulated_current(10.0 * entry(0, true).shunt_resistance);
    assert!((published - expected).abs() < 1e-12);
    assert!((published - 10.0).abs() > 1.0);

    let events = drain(&rx);
    assert_eq!(events.len(), cycles);
    assert!(events.iter().all(|e| e.kind == EventKind::CurrentOutOfRange && e.axis == 0));
    assert!(c.is_driven(0));
}

#[test]
fn velocity_axes_report_no_current() {
    let c = velocity_arm();
    enable(&c, 0);
    c.ports(0).unwrap().drive.set(1.0);
    c.ports(0).unwrap().torque.set(42.0);
    for _ in 0..3 {
        c.update();
    }
    assert_eq!(c.ports(0).unwrap().torque.get(), 42.0);
}

#[test]
fn position_event_when_leaving_the_envelope() {
    let c = simulated(vec![(
        entry(0, false),
        AxisLimits {
            lower_position_limit: -0.003,
            upper_position_limit: 0.003,
            ..wide_limits()
        },
    )]);
    enable(&c, 0);
    c.ports(0).unwrap().drive.set(2.0);

    // 2 rad/s at 1 ms: the second step ends at 0.004 rad, read by cycle 3
    let mut first_violation = None;
    for cycle in 1..=5u64 {
        let report = c.update();
        if report.count(EventKind::PositionOutOfRange) > 0 && first_violation.is_none() {
            first_violation = Some(cycle);
        }
    }
    assert_eq!(first_violation, Some(3));
    assert!(c.is_driven(0));
}

#[test]
fn every_subscriber_sees_every_event() {
    let c = velocity_arm();
    let first = c.subscribe();
    let second = c.subscribe();
    assert_eq!(c.events().subscriber_count(), 2);

    enable(&c, 0);
    c.ports(0).unwrap().drive.set(5.0);
    c.update();
    c.update();

    assert_eq!(drain(&first).len(), 1);
    assert_eq!(drain(&second).len(), 1);
    assert_eq!(c.events().published(), 1);
}

#[test]
fn dropped_subscriber_is_forgotten() {
    let c = velocity_arm();
    let kept = c.subscribe();
    drop(c.subscribe());

    enable(&c, 0);
    c.ports(0).unwrap().drive.set(5.0);
    c.update();
    c.update();

    assert_eq!(drain(&kept).len(), 1);
    assert_eq!(c.events().subscriber_count(), 1);
}

#[test]
fn slow_subscriber_loses_events_without_blocking() {
    let c = velocity_arm();
    let rx = c.events().subscribe_with_capacity(2);
    enable(&c, 0);
    c.ports(0).unwrap().drive.set(5.0);

    for _ in 0..6 {
        c.update();
    }
    assert_eq!(drain(&rx).len(), 2);
    assert_eq!(c.events().published(), 5);
    assert_eq!(c.events().dropped(), 3);
}

#[test]
fn resting_reference_arm_is_clean() {
    let c = reference_arm();
    for _ in 0..10 {
        assert!(c.update().is_clean());
    }
}

//! Integration test: axis lifecycle through the command surface.
//!
//! Covers the Locked/Stopped/Driven rules as seen by a caller:
//! 1. Lock always leaves an axis locked and not driven
//! 2. Refused transitions change nothing
//! 3. Aggregate commands visit every axis
//! 4. Completion predicates follow the lifecycle

use axion_common::prelude::*;
use axion_controller::{CommandError, ManipulatorController};

use super::{enable, reference_arm};

// ── Helpers ─────────────────────────────────────────────────────────

/// Put axis `i` of a six-axis arm into a different state per index:
/// 0,3 locked; 1,4 stopped; 2,5 driven.
fn mixed_states(c: &ManipulatorController) {
    assert!(c.prepare_for_use());
    for axis in 0..c.axis_count() {
        match axis % 3 {
            0 => {}
            1 => assert!(c.unlock_axis(axis)),
            _ => {
                assert!(c.unlock_axis(axis));
                assert!(c.start_axis(axis));
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn lock_leaves_axis_locked_and_not_driven() {
    let c = reference_arm();
    enable(&c, 0);
    assert!(c.is_driven(0));

    assert!(c.stop_axis(0));
    assert!(c.lock_axis(0));
    assert!(c.is_locked(0));
    assert!(!c.is_driven(0));
    assert!(c.lock_axis_completed(0));
}

#[test]
fn start_from_locked_fails_and_changes_nothing() {
    let c = reference_arm();
    c.prepare_for_use();
    let before = c.lifecycle(2);

    let err = c.execute(Command::StartAxis(2)).unwrap_err();
    assert!(matches!(err, CommandError::InvalidTransition { axis: 2, .. }));
    assert_eq!(c.lifecycle(2), before);
    assert!(c.is_locked(2));
    assert!(!c.start_axis_completed(2));
}

#[test]
fn stop_all_then_lock_all_locks_from_any_state() {
    let c = reference_arm();
    mixed_states(&c);
    assert!(c.is_locked(0) && c.is_stopped(1) && c.is_driven(2));

    // locked axes refuse the stop, the rest still stop
    assert_eq!(
        c.execute(Command::StopAllAxes),
        Err(CommandError::Aggregate { failed: vec![0, 3] })
    );
    assert!((0..6).all(|i| !c.is_driven(i)));
    assert!(c.is_stopped(1) && c.is_stopped(2) && c.is_locked(3));

    // stopped axes lock, already locked ones refuse
    assert_eq!(
        c.execute(Command::LockAllAxes),
        Err(CommandError::Aggregate { failed: vec![0, 3] })
    );
    assert!(c.lock_all_axes_completed());
    assert!((0..6).all(|i| c.is_locked(i) && !c.is_driven(i)));
}

#[test]
fn stop_is_idempotent() {
    let c = reference_arm();
    enable(&c, 4);
    assert!(c.stop_axis(4));
    let after_first = c.lifecycle(4);
    assert!(c.stop_axis(4));
    assert_eq!(c.lifecycle(4), after_first);
    assert_eq!(after_first, Some(AxisLifecycle::Stopped));
}

#[test]
fn unlock_requires_prepare_for_use() {
    let c = reference_arm();
    assert_eq!(
        c.execute(Command::UnlockAxis(0)),
        Err(CommandError::NotPrepared { axis: 0 })
    );
    assert!(c.is_locked(0));

    assert!(c.prepare_for_use());
    assert!(c.prepare_for_use_completed());
    assert!(c.unlock_axis(0));
    assert!(c.unlock_axis_completed(0));
}

#[test]
fn prepare_for_shutdown_revokes_unlock() {
    let c = reference_arm();
    mixed_states(&c);
    assert!(c.prepare_for_shutdown());
    assert!(c.prepare_for_shutdown_completed());
    assert!((0..6).all(|i| c.is_locked(i)));
    assert!(!c.is_activated());
    assert!(!c.unlock_axis(1));
}

#[test]
fn unlock_all_reports_nothing_when_every_axis_moves() {
    let c = reference_arm();
    c.prepare_for_use();
    assert!(c.unlock_all_axes());
    assert!(c.unlock_all_axes_completed());
    assert!(c.start_all_axes());
    assert!(c.start_all_axes_completed());
    assert!(!c.lock_all_axes_completed());
}

#[test]
fn out_of_range_index_is_rejected_everywhere() {
    let c = reference_arm();
    c.prepare_for_use();
    let invalid = CommandError::InvalidAxis { axis: 6, count: 6 };
    for command in [
        Command::StartAxis(6),
        Command::StopAxis(6),
        Command::LockAxis(6),
        Command::UnlockAxis(6),
        Command::AddDriveOffset(6, 0.5),
    ] {
        assert_eq!(c.execute(command), Err(invalid.clone()), "{command}");
    }
    assert!(!c.is_locked(6));
    assert!(!c.stop_axis_completed(6));
    assert_eq!(c.lifecycle(6), None);
}

#[test]
fn console_text_round_trips_through_execute() {
    let c = reference_arm();
    for line in ["prepareForUse", "unlockAxis 3", "startAxis 3"] {
        let command: Command = line.parse().unwrap();
        assert!(c.execute(command).is_ok(), "{line}");
        assert!(c.is_completed(command), "{line}");
    }
    assert!(c.is_driven(3));
}

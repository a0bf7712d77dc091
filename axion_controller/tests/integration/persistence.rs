//! Integration test: property file read at build, written at shutdown.

use axion_common::config::ConfigStore;
use axion_common::prelude::*;
use axion_controller::ManipulatorController;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

use super::wide_limits;

// ── Helpers ─────────────────────────────────────────────────────────

fn property_file(config: &ControllerConfig) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    config.store(file.path()).unwrap();
    file
}

fn six_axis_config() -> ControllerConfig {
    ControllerConfig {
        axes: (0..6)
            .map(|i| AxisLimits {
                drive_offset: 0.125 * i as f64,
                ..wide_limits()
            })
            .collect(),
        ..Default::default()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn limits_and_offsets_come_from_the_file() {
    let file = property_file(&six_axis_config());
    let c = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    assert_eq!(c.limits(3).unwrap().velocity_limit, 10.0);
    assert_eq!(c.drive_offset(4), Some(0.5));
}

#[test]
fn shutdown_writes_accumulated_offsets_back() {
    let file = property_file(&six_axis_config());
    let c = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    c.add_drive_offset(1, 0.25);
    c.add_drive_offset(1, 0.25);
    c.add_drive_offset(5, -0.625);
    c.shutdown().unwrap();

    let stored = ControllerConfig::load(file.path()).unwrap();
    assert_eq!(stored.axes.len(), 6);
    assert_eq!(stored.axes[1].drive_offset, 0.625);
    assert_eq!(stored.axes[5].drive_offset, 0.0);
    assert_eq!(stored.axes[0], six_axis_config().axes[0]);

    // a second controller picks up where the first stopped
    drop(c);
    let again = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    assert_eq!(again.drive_offset(1), Some(0.625));
}

#[test]
fn shutdown_runs_once() {
    let file = property_file(&six_axis_config());
    let c = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    c.shutdown().unwrap();
    let written = fs::read_to_string(file.path()).unwrap();

    c.add_drive_offset(0, 1.0);
    c.shutdown().unwrap();
    assert_eq!(fs::read_to_string(file.path()).unwrap(), written);
}

#[test]
fn short_axis_list_is_padded_and_completed_on_shutdown() {
    let mut config = six_axis_config();
    config.axes.truncate(2);
    let file = property_file(&config);

    let c = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    assert_eq!(c.axis_count(), 6);
    assert_eq!(c.limits(4), Some(&AxisLimits::default()));
    c.shutdown().unwrap();

    let stored = ControllerConfig::load(file.path()).unwrap();
    assert_eq!(stored.axes.len(), 6);
}

#[test]
fn broken_file_gives_zeroed_limits_and_is_kept() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"cycle_time_us = \"fast\"\n[[axes]\n").unwrap();
    let original = fs::read_to_string(file.path()).unwrap();

    let c = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    assert_eq!(c.axis_count(), 6);
    assert!((0..6).all(|i| c.limits(i) == Some(&AxisLimits::default())));

    c.add_drive_offset(0, 1.0);
    c.shutdown().unwrap();
    assert_eq!(fs::read_to_string(file.path()).unwrap(), original);
}

#[test]
fn invalid_limits_are_treated_like_a_broken_file() {
    let mut config = six_axis_config();
    config.axes[2].lower_position_limit = 5.0;
    config.axes[2].upper_position_limit = -5.0;
    let file = property_file(&config);

    let c = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    assert_eq!(c.limits(0), Some(&AxisLimits::default()));
    c.shutdown().unwrap();
    assert_eq!(ControllerConfig::load(file.path()).unwrap(), config);
}

#[test]
fn missing_file_is_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arm.toml");
    let c = ManipulatorController::from_config_file("arm", &path).unwrap();
    assert_eq!(c.limits(0), Some(&AxisLimits::default()));
    c.shutdown().unwrap();
    assert!(!path.exists());
}

#[test]
fn calibration_file_is_honoured() {
    let dir = tempfile::tempdir().unwrap();
    let calibration_path = dir.path().join("calibration.toml");
    let table = CalibrationTable::new(
        CalibrationTable::reference().iter().take(3).copied().collect(),
    )
    .unwrap();
    table.store(&calibration_path).unwrap();

    let config = ControllerConfig {
        calibration_file: Some(calibration_path),
        ..Default::default()
    };
    let file = property_file(&config);
    let c = ManipulatorController::from_config_file("arm", file.path()).unwrap();
    assert_eq!(c.axis_count(), 3);
    assert_eq!(c.calibration(), &table);
}

#[test]
fn unreadable_calibration_file_is_an_error() {
    let config = ControllerConfig {
        calibration_file: Some("/nonexistent/calibration.toml".into()),
        ..Default::default()
    };
    let file = property_file(&config);
    let result = ManipulatorController::from_config_file("arm", file.path());
    assert!(matches!(
        result,
        Err(axion_controller::ControllerError::Calibration(_))
    ));
}

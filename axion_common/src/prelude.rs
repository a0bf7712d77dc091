//! Prelude module for common re-exports.
//!
//! ```rust
//! use axion_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel};
pub use crate::control_unit::config::{AxisLimits, ControllerConfig, DynamicsConfig, IoLayout};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_AXES};

// ─── Axis capability ────────────────────────────────────────────────
pub use crate::hal::axis::{Axis, AxisVariant, DriveOutcome, SensorKind};
pub use crate::hal::calibration::{CalibrationEntry, CalibrationError, CalibrationTable};
pub use crate::hal::dynamics::PlantDynamics;
pub use crate::hal::error::HalError;
pub use crate::hal::io::IoBackend;
pub use crate::hal::lifecycle::{AxisLifecycle, LifecycleEvent, TransitionError};

// ─── Commands & events ──────────────────────────────────────────────
pub use crate::control_unit::command::{Command, CommandParseError};
pub use crate::control_unit::event::{EventKind, Notification, OutOfRange};

/// Default control cycle time as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_micros(DEFAULT_CYCLE_TIME_US as u64);

//! Error types for the controller layer.

use axion_common::config::ConfigError;
use axion_common::hal::calibration::CalibrationError;
use axion_common::hal::error::HalError;
use axion_common::hal::lifecycle::TransitionError;
use std::time::Duration;
use thiserror::Error;

/// Controller construction and instantiation failures.
#[derive(Debug, Clone, Error)]
pub enum ControllerError {
    /// Property file problem that cannot be defaulted away.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// Calibration table missing or invalid.
    #[error("calibration: {0}")]
    Calibration(#[from] CalibrationError),

    /// Axis or plant construction failed.
    #[error("axis layer: {0}")]
    Hal(#[from] HalError),

    /// No factory registered under this type name.
    #[error("unknown component type '{0}'")]
    UnknownType(String),
}

/// Rejected or failed command.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Axis index outside `0..count`.
    #[error("axis {axis} does not exist (controller has {count} axes)")]
    InvalidAxis {
        /// Requested index.
        axis: usize,
        /// Axis count.
        count: usize,
    },

    /// Lifecycle state does not allow the command.
    #[error("axis {axis}: {source}")]
    InvalidTransition {
        /// Axis index.
        axis: usize,
        /// Refused transition.
        source: TransitionError,
    },

    /// Unlock requested before prepare-for-use.
    #[error("axis {axis}: controller not prepared for use")]
    NotPrepared {
        /// Axis index.
        axis: usize,
    },

    /// Output write failed on an axis.
    #[error("axis {axis}: {source}")]
    Hardware {
        /// Axis index.
        axis: usize,
        /// Backend error.
        source: HalError,
    },

    /// Output write failed outside any axis (interlock relays).
    #[error("interlock: {0}")]
    Interlock(HalError),

    /// An aggregate command failed on some axes. The rest were still tried.
    #[error("failed on axes {failed:?}")]
    Aggregate {
        /// Indices that failed, ascending.
        failed: Vec<usize>,
    },
}

impl CommandError {
    /// Attribute an axis-layer error to `axis`.
    pub fn from_axis(axis: usize, error: HalError) -> Self {
        match error {
            HalError::Transition(source) => Self::InvalidTransition { axis, source },
            source => Self::Hardware { axis, source },
        }
    }
}

/// Cycle runner failures.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT setup syscall failed.
    #[error("RT setup failed: {0}")]
    RtSetup(String),

    /// A cycle took longer than its period and the runner aborts on overrun.
    #[error("cycle {cycle} overran: {actual:?} > {budget:?} budget")]
    CycleOverrun {
        /// Number of the offending cycle.
        cycle: u64,
        /// Time spent in the cycle.
        actual: Duration,
        /// Cycle period.
        budget: Duration,
    },
}

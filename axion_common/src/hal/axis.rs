//! The axis capability.
//!
//! A controller owns a fixed set of axes chosen once at construction: either
//! every axis talks to real I/O channels or every axis is simulated. The
//! controller only ever sees `Box<dyn Axis>`.
//!
//! # Lifecycle contract
//!
//! | Method | Allowed from | Leaves the axis |
//! |--------|--------------|-----------------|
//! | [`Axis::unlock`] | Locked | Stopped |
//! | [`Axis::lock`] | Stopped | Locked |
//! | [`Axis::start`] | Stopped | Driven |
//! | [`Axis::stop`] | Driven, Stopped | Stopped |
//!
//! A refused call returns [`HalError::Transition`] and leaves the state
//! unchanged. [`Axis::drive`] only writes while the axis is Driven.

use crate::hal::error::HalError;
use crate::hal::lifecycle::AxisLifecycle;
use std::fmt;
use std::str::FromStr;

/// Physical quantity an axis can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// Joint angle in radians.
    Position,
    /// Joint speed in radians per second.
    Velocity,
    /// Motor current in amperes.
    Current,
}

impl SensorKind {
    /// Every sensor kind, in reporting order.
    pub const ALL: [SensorKind; 3] = [Self::Position, Self::Velocity, Self::Current];

    /// Name used in property files and on the console.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Position => "Position",
            Self::Velocity => "Velocity",
            Self::Current => "Current",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorKind {
    type Err = HalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| HalError::ConfigError(format!("unknown sensor '{s}'")))
    }
}

/// Which implementation backs an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisVariant {
    /// Encoders, tachometers and drive amplifiers behind an I/O backend.
    Hardware,
    /// Integrator driven by the plant dynamics model.
    Simulated,
}

impl fmt::Display for AxisVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hardware => "hardware",
            Self::Simulated => "simulated",
        })
    }
}

/// Result of one [`Axis::drive`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveOutcome {
    /// The axis is not Driven; nothing was written.
    Rejected,
    /// The command was written as given.
    Applied,
    /// The command exceeded the drive limit and was written clamped.
    Clamped {
        /// Command as requested, before clamping.
        requested: f64,
    },
}

impl DriveOutcome {
    /// A command reached the actuator, clamped or not.
    #[inline]
    pub const fn accepted(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Requested command when it had to be clamped.
    #[inline]
    pub const fn clamped(self) -> Option<f64> {
        match self {
            Self::Clamped { requested } => Some(requested),
            _ => None,
        }
    }
}

/// One joint of the manipulator.
///
/// Implementations own their lifecycle state; the controller serializes all
/// calls to a given axis.
pub trait Axis: Send {
    /// Current lifecycle state.
    fn lifecycle(&self) -> AxisLifecycle;

    /// Brake engaged and drive disabled.
    fn is_locked(&self) -> bool {
        self.lifecycle() == AxisLifecycle::Locked
    }

    /// Drive enabled with a neutral command.
    fn is_stopped(&self) -> bool {
        self.lifecycle() == AxisLifecycle::Stopped
    }

    /// Actuator command forwarded every cycle.
    fn is_driven(&self) -> bool {
        self.lifecycle() == AxisLifecycle::Driven
    }

    /// Release the brake and enable the drive.
    fn unlock(&mut self) -> Result<(), HalError>;

    /// Disable the drive and engage the brake.
    fn lock(&mut self) -> Result<(), HalError>;

    /// Begin accepting drive commands. Writes the neutral command.
    fn start(&mut self) -> Result<(), HalError>;

    /// Write the neutral command and stop accepting drive commands.
    fn stop(&mut self) -> Result<(), HalError>;

    /// Write the actuator command.
    ///
    /// The value is a current for torque-controlled axes and a velocity for
    /// velocity-controlled axes. Returns [`DriveOutcome::Rejected`] without
    /// side effects unless the axis is Driven.
    fn drive(&mut self, value: f64) -> DriveOutcome;

    /// Acceleration computed by the plant model for the current cycle.
    ///
    /// Consumed by the next [`Axis::drive`]. Real joints ignore it.
    fn apply_plant_acceleration(&mut self, _acceleration: f64) {}

    /// Read one sensor, converted to physical units.
    ///
    /// `None` when the axis has no such sensor or the read failed.
    fn sensor(&mut self, kind: SensorKind) -> Option<f64>;

    /// Whether the drive input is a current (torque) command.
    fn torque_controlled(&self) -> bool;

    /// Implementation backing this axis.
    fn variant(&self) -> AxisVariant;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_kind_parses_exact_names() {
        assert_eq!("Position".parse::<SensorKind>().unwrap(), SensorKind::Position);
        assert_eq!("Velocity".parse::<SensorKind>().unwrap(), SensorKind::Velocity);
        assert_eq!("Current".parse::<SensorKind>().unwrap(), SensorKind::Current);
        assert!("position".parse::<SensorKind>().is_err());
        assert!("Torque".parse::<SensorKind>().is_err());
    }

    #[test]
    fn drive_outcome_accessors() {
        assert!(!DriveOutcome::Rejected.accepted());
        assert!(DriveOutcome::Applied.accepted());
        let clamped = DriveOutcome::Clamped { requested: -7.5 };
        assert!(clamped.accepted());
        assert_eq!(clamped.clamped(), Some(-7.5));
        assert_eq!(DriveOutcome::Applied.clamped(), None);
    }

    #[test]
    fn sensor_kind_display_round_trips() {
        for kind in SensorKind::ALL {
            assert_eq!(kind.to_string().parse::<SensorKind>().unwrap(), kind);
        }
    }
}

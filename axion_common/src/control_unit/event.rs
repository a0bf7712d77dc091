//! Safety notifications raised by the control cycle.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Envelope violations found on one axis in one cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OutOfRange: u8 {
        /// Position outside `[lower, upper]`.
        const POSITION = 0x01;
        /// |velocity| above the velocity limit.
        const VELOCITY = 0x02;
        /// |current| above the current limit.
        const CURRENT  = 0x04;
    }
}

/// Kind of envelope violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Velocity outside `±velocity_limit`.
    VelocityOutOfRange,
    /// Position outside `[lower_position_limit, upper_position_limit]`.
    PositionOutOfRange,
    /// Measured current outside `±current_limit`.
    CurrentOutOfRange,
}

impl EventKind {
    /// Human-readable text carried with the notification.
    pub const fn message(self) -> &'static str {
        match self {
            Self::VelocityOutOfRange => "Velocity of an axis is out of range",
            Self::PositionOutOfRange => "Position of an axis is out of range",
            Self::CurrentOutOfRange => "Current of an axis is out of range",
        }
    }

    /// Matching violation flag.
    pub const fn flag(self) -> OutOfRange {
        match self {
            Self::VelocityOutOfRange => OutOfRange::VELOCITY,
            Self::PositionOutOfRange => OutOfRange::POSITION,
            Self::CurrentOutOfRange => OutOfRange::CURRENT,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VelocityOutOfRange => "velocityOutOfRange",
            Self::PositionOutOfRange => "positionOutOfRange",
            Self::CurrentOutOfRange => "currentOutOfRange",
        })
    }
}

/// One raised event. Fire-and-forget: nobody acknowledges it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Notification {
    /// What was violated.
    pub kind: EventKind,
    /// Axis index.
    pub axis: usize,
    /// Offending reading.
    pub value: f64,
    /// Human-readable text.
    pub message: &'static str,
}

impl Notification {
    /// Notification with the kind's standard message.
    pub const fn new(kind: EventKind, axis: usize, value: f64) -> Self {
        Self {
            kind,
            axis,
            value,
            message: kind.message(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (axis {}, value {})", self.message, self.axis, self.value)
    }
}

//! Per-axis lifecycle state machine: Locked / Stopped / Driven.
//!
//! ```text
//!            unlock              start
//!  Locked ──────────► Stopped ──────────► Driven
//!         ◄──────────   │  ▲  ◄──────────
//!            lock       └──┘     stop
//!                       stop
//! ```
//!
//! There is no edge between `Locked` and `Driven`: an axis must be unlocked
//! before it can be started and stopped before it can be locked. Guards that
//! depend on the controller (prepared-for-use, index validity) are checked by
//! the caller before the event is applied.

use std::fmt;
use thiserror::Error;

/// Lifecycle state of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum AxisLifecycle {
    /// Brake engaged, drive disabled. Initial state.
    #[default]
    Locked = 0,
    /// Brake released, drive enabled, neutral command.
    Stopped = 1,
    /// Actuator command is updated every cycle.
    Driven = 2,
}

impl fmt::Display for AxisLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Locked => "locked",
            Self::Stopped => "stopped",
            Self::Driven => "driven",
        })
    }
}

/// Events that drive the lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Release the brake (Locked → Stopped).
    Unlock,
    /// Engage the brake (Stopped → Locked).
    Lock,
    /// Begin forwarding drive commands (Stopped → Driven).
    Start,
    /// Neutral command, stop forwarding (Driven/Stopped → Stopped).
    Stop,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unlock => "unlock",
            Self::Lock => "lock",
            Self::Start => "start",
            Self::Stop => "stop",
        })
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {event} an axis that is {from}")]
pub struct TransitionError {
    /// State the axis was in.
    pub from: AxisLifecycle,
    /// Event that was refused.
    pub event: LifecycleEvent,
}

impl AxisLifecycle {
    /// Apply `event`, returning the next state or the rejection.
    ///
    /// The receiver is not modified; callers commit the returned state only
    /// after the physical side effect has been performed.
    pub const fn on(self, event: LifecycleEvent) -> Result<Self, TransitionError> {
        use AxisLifecycle::*;
        use LifecycleEvent::*;

        match (self, event) {
            (Locked, Unlock) => Ok(Stopped),
            (Stopped, Lock) => Ok(Locked),
            (Stopped, Start) => Ok(Driven),
            (Driven, Stop) | (Stopped, Stop) => Ok(Stopped),
            (from, event) => Err(TransitionError { from, event }),
        }
    }

    /// Whether the actuator output may be updated.
    #[inline]
    pub const fn allows_drive(self) -> bool {
        matches!(self, Self::Driven)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

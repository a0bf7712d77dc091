//! Published values and drive inputs.
//!
//! Ports are last-write-wins cells shared between the control cycle and any
//! number of readers or writers on other threads. A reader always sees a
//! complete `f64`; there is no history and no notification.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free `f64` cell.
#[derive(Debug, Default)]
pub struct ValuePort(AtomicU64);

impl ValuePort {
    /// Port holding `value`.
    pub const fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Current value.
    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Replace the value.
    #[inline]
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }

    /// Add `delta` atomically and return the new value.
    pub fn add(&self, delta: f64) -> f64 {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return f64::from_bits(next),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Ports of one axis.
#[derive(Debug, Default)]
pub struct AxisPorts {
    /// Joint angle published every cycle, rad.
    pub position: ValuePort,
    /// Joint speed published every cycle, rad/s.
    pub velocity: ValuePort,
    /// Measured motor current of torque-controlled axes, A.
    pub torque: ValuePort,
    /// Drive input read by the cycle while the axis is driven.
    pub drive: ValuePort,
}

impl AxisPorts {
    /// Ports of an axis resting at `position`.
    pub fn at(position: f64) -> Self {
        Self {
            position: ValuePort::new(position),
            ..Default::default()
        }
    }
}

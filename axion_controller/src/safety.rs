//! Safety envelope checks and notification delivery.
//!
//! The cycle compares every published reading against the axis limits and
//! raises one [`Notification`] per violation. Delivery never blocks the
//! cycle: each subscriber has a bounded queue and events that do not fit
//! are dropped and counted. Every event is logged at `warn` regardless of
//! subscribers.

use axion_common::consts::EVENT_QUEUE_DEPTH;
use axion_common::control_unit::config::AxisLimits;
use axion_common::control_unit::event::{EventKind, Notification};
use axion_common::hal::axis::DriveOutcome;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Position envelope check.
#[inline]
pub fn check_position(limits: &AxisLimits, axis: usize, position: f64) -> Option<Notification> {
    (!limits.position_in_range(position))
        .then(|| Notification::new(EventKind::PositionOutOfRange, axis, position))
}

/// Velocity envelope check.
#[inline]
pub fn check_velocity(limits: &AxisLimits, axis: usize, velocity: f64) -> Option<Notification> {
    (!limits.velocity_in_range(velocity))
        .then(|| Notification::new(EventKind::VelocityOutOfRange, axis, velocity))
}

/// Current envelope check.
#[inline]
pub fn check_current(limits: &AxisLimits, axis: usize, current: f64) -> Option<Notification> {
    (!limits.current_in_range(current))
        .then(|| Notification::new(EventKind::CurrentOutOfRange, axis, current))
}

/// Drive command clamped by the axis: a current violation on torque axes,
/// a velocity violation otherwise. Carries the requested command.
#[inline]
pub fn check_drive(axis: usize, torque_controlled: bool, outcome: DriveOutcome) -> Option<Notification> {
    let kind = if torque_controlled {
        EventKind::CurrentOutOfRange
    } else {
        EventKind::VelocityOutOfRange
    };
    outcome
        .clamped()
        .map(|requested| Notification::new(kind, axis, requested))
}

/// Fan-out of notifications to bounded subscriber queues.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<Notification>>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl EventBus {
    /// Bus without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe with the default queue depth.
    pub fn subscribe(&self) -> Receiver<Notification> {
        self.subscribe_with_capacity(EVENT_QUEUE_DEPTH)
    }

    /// Subscribe with a queue of `capacity` events.
    pub fn subscribe_with_capacity(&self, capacity: usize) -> Receiver<Notification> {
        let (tx, rx) = bounded(capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Log and deliver `event`. Never blocks.
    pub fn publish(&self, event: Notification) {
        warn!(
            event = %event.kind,
            axis = event.axis,
            value = event.value,
            "{}",
            event.message
        );
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Events published since construction.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Deliveries dropped because a subscriber queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

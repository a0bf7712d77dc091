//! System-wide constants for the Axion workspace.
//!
//! Single source of truth for numeric limits and default paths.

use static_assertions::const_assert;

/// Maximum number of axes a single controller instance can own.
pub const MAX_AXES: usize = 16;

/// Default control cycle time in microseconds (1 kHz = 1000 µs).
pub const DEFAULT_CYCLE_TIME_US: u32 = 1000;

/// Shortest accepted control cycle, microseconds.
pub const CYCLE_TIME_US_MIN: u32 = 100;

/// Longest accepted control cycle, microseconds.
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Default controller property file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/axion/controller.toml";

/// Capacity of each notification subscriber queue.
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// Number of axes in the factory-calibrated reference arm.
pub const REFERENCE_AXES: usize = 6;

/// Joint inertia assumed by the decoupled plant model when none is configured.
pub const DEFAULT_JOINT_INERTIA: f64 = 1.0;

const_assert!(REFERENCE_AXES <= MAX_AXES);
const_assert!(CYCLE_TIME_US_MIN <= DEFAULT_CYCLE_TIME_US);
const_assert!(DEFAULT_CYCLE_TIME_US <= CYCLE_TIME_US_MAX);
const_assert!(MAX_AXES <= u8::MAX as usize);

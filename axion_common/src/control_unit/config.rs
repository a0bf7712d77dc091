//! Controller property file.
//!
//! ```toml
//! simulation = true
//! cycle_time_us = 1000
//! log_level = "info"
//!
//! [[axes]]
//! velocity_limit = 2.0
//! current_limit = 10.0
//! lower_position_limit = -3.0
//! upper_position_limit = 3.0
//! initial_position = 0.0
//! drive_offset = 0.0
//!
//! [dynamics]
//! model = "decoupled"
//! inertia = [1.0, 1.0]
//!
//! [io]
//! interlock_outputs = [12, 14]
//! ```
//!
//! Every field has a default so partial files load. The file is read once
//! when a controller is built and written back at shutdown with the drive
//! offsets accumulated at runtime.

use crate::config::{ConfigError, ConfigLoader, LogLevel};
use crate::consts::{CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, DEFAULT_CYCLE_TIME_US, MAX_AXES};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::warn;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Build simulated axes instead of hardware axes. Fixed for the
    /// controller's lifetime.
    #[serde(default = "default_simulation")]
    pub simulation: bool,

    /// Control cycle period in microseconds (default: 1000).
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Log level used by the binary when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Calibration table to use instead of the reference arm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_file: Option<PathBuf>,

    /// Safety envelope and drive offset per axis, in axis order.
    #[serde(default)]
    pub axes: Vec<AxisLimits>,

    /// Plant model used in simulation.
    #[serde(default)]
    pub dynamics: DynamicsConfig,

    /// I/O channel layout used by hardware axes.
    #[serde(default)]
    pub io: IoLayout,
}

fn default_simulation() -> bool {
    true
}
fn default_cycle_time_us() -> u32 {
    DEFAULT_CYCLE_TIME_US
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            simulation: default_simulation(),
            cycle_time_us: default_cycle_time_us(),
            log_level: LogLevel::default(),
            calibration_file: None,
            axes: Vec::new(),
            dynamics: DynamicsConfig::default(),
            io: IoLayout::default(),
        }
    }
}

impl ControllerConfig {
    /// Load and validate `path`, falling back to defaults on any failure.
    ///
    /// A controller must come up even with a broken property file: the
    /// failure is logged and every axis gets zeroed limits.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_validated(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Using default controller configuration");
                Self::default()
            }
        }
    }

    /// Load `path` and reject it unless it validates.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(CYCLE_TIME_US_MIN..=CYCLE_TIME_US_MAX).contains(&self.cycle_time_us) {
            return Err(ConfigError::ValidationError(format!(
                "cycle_time_us {} out of range [{}, {}]",
                self.cycle_time_us, CYCLE_TIME_US_MIN, CYCLE_TIME_US_MAX
            )));
        }
        if self.axes.len() > MAX_AXES {
            return Err(ConfigError::ValidationError(format!(
                "{} axes configured, at most {} supported",
                self.axes.len(),
                MAX_AXES
            )));
        }
        for (axis, limits) in self.axes.iter().enumerate() {
            limits
                .validate()
                .map_err(|e| ConfigError::ValidationError(format!("axis {axis}: {e}")))?;
        }
        self.dynamics
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("dynamics: {e}")))?;
        self.io
            .validate(self.axes.len().max(1))
            .map_err(|e| ConfigError::ValidationError(format!("io: {e}")))
    }

    /// Limits for exactly `axes` axes.
    ///
    /// Missing entries are zeroed, surplus entries are ignored.
    pub fn limits_for(&self, axes: usize) -> Vec<AxisLimits> {
        if self.axes.len() != axes {
            warn!(
                configured = self.axes.len(),
                expected = axes,
                "Axis limit count does not match calibration"
            );
        }
        let mut limits = self.axes.clone();
        limits.resize(axes, AxisLimits::default());
        limits
    }

    /// Cycle period as a `Duration`.
    pub fn cycle_time(&self) -> std::time::Duration {
        std::time::Duration::from_micros(u64::from(self.cycle_time_us))
    }
}

// ─── Axis Limits ────────────────────────────────────────────────────

/// Safety envelope of one axis.
///
/// The default is all zero, which is what an axis gets when the property
/// file is missing or broken.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisLimits {
    /// Maximum |velocity|, rad/s. Also the drive clamp of velocity axes.
    #[serde(default)]
    pub velocity_limit: f64,
    /// Maximum |current|, A. Also the drive clamp of torque axes.
    #[serde(default)]
    pub current_limit: f64,
    /// Lowest allowed joint angle, rad.
    #[serde(default)]
    pub lower_position_limit: f64,
    /// Highest allowed joint angle, rad.
    #[serde(default)]
    pub upper_position_limit: f64,
    /// Start angle of a simulated axis, rad.
    #[serde(default)]
    pub initial_position: f64,
    /// Added to the drive input of velocity-controlled axes.
    #[serde(default)]
    pub drive_offset: f64,
}

impl AxisLimits {
    /// Check signs, ordering and finiteness.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("velocity_limit", self.velocity_limit),
            ("current_limit", self.current_limit),
            ("lower_position_limit", self.lower_position_limit),
            ("upper_position_limit", self.upper_position_limit),
            ("initial_position", self.initial_position),
            ("drive_offset", self.drive_offset),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{name} is not finite"));
        }
        if self.velocity_limit < 0.0 {
            return Err(format!("velocity_limit {} is negative", self.velocity_limit));
        }
        if self.current_limit < 0.0 {
            return Err(format!("current_limit {} is negative", self.current_limit));
        }
        if self.lower_position_limit > self.upper_position_limit {
            return Err(format!(
                "lower_position_limit {} above upper_position_limit {}",
                self.lower_position_limit, self.upper_position_limit
            ));
        }
        Ok(())
    }

    /// Whether `position` lies inside the closed position interval.
    #[inline]
    pub fn position_in_range(&self, position: f64) -> bool {
        position >= self.lower_position_limit && position <= self.upper_position_limit
    }

    /// Whether `|velocity| ≤ velocity_limit`.
    #[inline]
    pub fn velocity_in_range(&self, velocity: f64) -> bool {
        velocity.abs() <= self.velocity_limit
    }

    /// Whether `|current| ≤ current_limit`.
    #[inline]
    pub fn current_in_range(&self, current: f64) -> bool {
        current.abs() <= self.current_limit
    }
}

// ─── Plant Model ────────────────────────────────────────────────────

/// Plant model selection for simulation.
///
/// Per-axis vectors shorter than the axis count are padded with the model's
/// defaults (unit inertia, no damping, no gravity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DynamicsConfig {
    /// Independent joints: `J·a = τ − d·v`.
    Decoupled {
        /// Joint inertia, kg·m².
        #[serde(default)]
        inertia: Vec<f64>,
        /// Viscous damping, N·m·s/rad.
        #[serde(default)]
        damping: Vec<f64>,
    },
    /// Constant mass matrix: `M·a = τ − d∘v − g∘sin(q)`.
    Coupled {
        /// Symmetric positive-definite mass matrix, row-major.
        mass_matrix: Vec<Vec<f64>>,
        /// Viscous damping per joint.
        #[serde(default)]
        damping: Vec<f64>,
        /// Gravity load amplitude per joint, N·m.
        #[serde(default)]
        gravity: Vec<f64>,
    },
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self::Decoupled {
            inertia: Vec::new(),
            damping: Vec::new(),
        }
    }
}

impl DynamicsConfig {
    /// Shape and sign checks that do not need the axis count.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Decoupled { inertia, damping } => {
                if let Some(j) = inertia.iter().find(|j| !(j.is_finite() && **j > 0.0)) {
                    return Err(format!("inertia {j} must be positive"));
                }
                if damping.iter().any(|d| !d.is_finite()) {
                    return Err("damping must be finite".to_string());
                }
            }
            Self::Coupled {
                mass_matrix,
                damping,
                gravity,
            } => {
                let n = mass_matrix.len();
                if n == 0 {
                    return Err("mass_matrix is empty".to_string());
                }
                if mass_matrix.iter().any(|row| row.len() != n) {
                    return Err(format!("mass_matrix must be {n}x{n}"));
                }
                if mass_matrix.iter().flatten().any(|m| !m.is_finite()) {
                    return Err("mass_matrix must be finite".to_string());
                }
                if damping.len() > n || gravity.len() > n {
                    return Err(format!("damping/gravity longer than mass_matrix ({n})"));
                }
            }
        }
        Ok(())
    }
}

// ─── I/O Layout ─────────────────────────────────────────────────────

/// Channel assignment of hardware axes.
///
/// Axis `i` uses channel `base + i` of each per-axis block. Defaults follow
/// the reference arm's wiring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoLayout {
    /// First absolute encoder channel.
    pub encoder_base: usize,
    /// First tachometer analog input.
    pub tacho_input_base: usize,
    /// First current-shunt analog input.
    pub current_input_base: usize,
    /// First drive reference analog output.
    pub drive_output_base: usize,
    /// First drive enable digital output.
    pub enable_output_base: usize,
    /// First brake digital output.
    pub brake_output_base: usize,
    /// First torque/velocity mode relay digital output.
    pub mode_output_base: usize,
    /// Safety interlock relays switched on by prepare-for-use.
    pub interlock_outputs: [usize; 2],
    /// Inputs that confirm the interlock is closed.
    pub interlock_inputs: [usize; 2],
}

impl Default for IoLayout {
    fn default() -> Self {
        Self {
            encoder_base: 0,
            tacho_input_base: 0,
            current_input_base: 6,
            drive_output_base: 0,
            enable_output_base: 0,
            brake_output_base: 6,
            mode_output_base: 16,
            interlock_outputs: [12, 14],
            interlock_inputs: [12, 14],
        }
    }
}

impl IoLayout {
    /// Encoder channel of `axis`.
    pub const fn encoder(&self, axis: usize) -> usize {
        self.encoder_base + axis
    }
    /// Tachometer input of `axis`.
    pub const fn tacho_input(&self, axis: usize) -> usize {
        self.tacho_input_base + axis
    }
    /// Current input of `axis`.
    pub const fn current_input(&self, axis: usize) -> usize {
        self.current_input_base + axis
    }
    /// Drive reference output of `axis`.
    pub const fn drive_output(&self, axis: usize) -> usize {
        self.drive_output_base + axis
    }
    /// Drive enable output of `axis`.
    pub const fn enable_output(&self, axis: usize) -> usize {
        self.enable_output_base + axis
    }
    /// Brake output of `axis`.
    pub const fn brake_output(&self, axis: usize) -> usize {
        self.brake_output_base + axis
    }
    /// Mode relay output of `axis`.
    pub const fn mode_output(&self, axis: usize) -> usize {
        self.mode_output_base + axis
    }

    /// Reject layouts where a channel block runs past `usize::MAX` or two
    /// signals of the same kind share a channel.
    pub fn validate(&self, axes: usize) -> Result<(), String> {
        let block = |name: &'static str, base: usize, len: usize| {
            base.checked_add(len)
                .map(|end| (name, base..end))
                .ok_or_else(|| format!("{name} starting at {base} overflow the channel range"))
        };

        block("encoders", self.encoder_base, axes)?;
        block("drive outputs", self.drive_output_base, axes)?;

        let analog_inputs = [
            block("tacho inputs", self.tacho_input_base, axes)?,
            block("current inputs", self.current_input_base, axes)?,
        ];
        check_disjoint(&analog_inputs)?;

        let [a, b] = self.interlock_outputs;
        let digital_outputs = [
            block("enable outputs", self.enable_output_base, axes)?,
            block("brake outputs", self.brake_output_base, axes)?,
            block("mode outputs", self.mode_output_base, axes)?,
            block("interlock output", a, 1)?,
            block("interlock output", b, 1)?,
        ];
        check_disjoint(&digital_outputs)?;

        if self.interlock_inputs[0] == self.interlock_inputs[1] {
            return Err("interlock inputs must differ".to_string());
        }
        Ok(())
    }
}

fn check_disjoint(blocks: &[(&str, Range<usize>)]) -> Result<(), String> {
    for (i, (name_a, a)) in blocks.iter().enumerate() {
        for (name_b, b) in &blocks[i + 1..] {
            if a.start < b.end && b.start < a.end {
                return Err(format!("{name_a} {a:?} overlap {name_b} {b:?}"));
            }
        }
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────

//! Per-axis calibration constants.
//!
//! Calibration is constant for the lifetime of a controller. It converts raw
//! channel values (encoder ticks, tachometer and shunt volts) into physical
//! units and back again for the drive output.
//!
//! The table can come from a TOML file:
//!
//! ```toml
//! [[axes]]
//! ticks_to_radians = 1.63e-5
//! drive_to_volt = 2.5545
//! tacho_scale = 9.275
//! tacho_offset = 0.0112
//! current_reg_a = -0.7874
//! current_reg_b = -0.0248
//! shunt_resistance = 0.1733
//! torque_constant = 151.07
//! torque_controlled = true
//! encoder_offset = 1000004
//! ```

use crate::config::{ConfigError, ConfigLoader};
use crate::consts::{MAX_AXES, REFERENCE_AXES};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use thiserror::Error;

/// Encoder resolution of the reference arm (ticks per motor revolution).
const ENCODER_TICKS_PER_REV: f64 = 4096.0;

/// Calibration failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalibrationError {
    /// A scale factor that is used as a multiplier or divisor is zero.
    #[error("axis {axis}: {field} must be non-zero")]
    ZeroScale {
        /// Axis index.
        axis: usize,
        /// Offending field.
        field: &'static str,
    },

    /// A field is NaN or infinite.
    #[error("axis {axis}: {field} is not finite")]
    NotFinite {
        /// Axis index.
        axis: usize,
        /// Offending field.
        field: &'static str,
    },

    /// No axes, or more than [`MAX_AXES`].
    #[error("calibration table has {0} axes (expected 1..={MAX_AXES})")]
    AxisCount(usize),

    /// The calibration file could not be read.
    #[error(transparent)]
    Load(#[from] ConfigError),
}

/// Constants for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Radians per encoder tick (signed, encodes mounting direction).
    pub ticks_to_radians: f64,
    /// Drive volts per unit of velocity command.
    pub drive_to_volt: f64,
    /// Radians per second per tachometer volt.
    pub tacho_scale: f64,
    /// Tachometer zero correction, radians per second.
    pub tacho_offset: f64,
    /// Current regulator gain.
    pub current_reg_a: f64,
    /// Current regulator bias, volts.
    pub current_reg_b: f64,
    /// Current shunt, ohms.
    pub shunt_resistance: f64,
    /// Joint torque per ampere.
    pub torque_constant: f64,
    /// Drive input is a current command (true) or a velocity command.
    pub torque_controlled: bool,
    /// Encoder reading at the joint zero.
    #[serde(default)]
    pub encoder_offset: i64,
}

impl CalibrationEntry {
    /// Joint angle for a raw encoder reading. Readings that would overflow
    /// the tick difference saturate.
    #[inline]
    pub fn position_from_ticks(&self, ticks: i64) -> f64 {
        ticks.saturating_sub(self.encoder_offset) as f64 * self.ticks_to_radians
    }

    /// Joint speed for a tachometer voltage.
    #[inline]
    pub fn velocity_from_volts(&self, volts: f64) -> f64 {
        volts * self.tacho_scale + self.tacho_offset
    }

    /// Motor current for a shunt voltage.
    #[inline]
    pub fn current_from_volts(&self, volts: f64) -> f64 {
        volts / self.shunt_resistance
    }

    /// Drive voltage for a command in the axis's command units.
    #[inline]
    pub fn drive_volts(&self, command: f64) -> f64 {
        if self.torque_controlled {
            command * self.shunt_resistance
        } else {
            command * self.drive_to_volt
        }
    }

    /// Current the regulator settles at for a given command voltage.
    #[inline]
    pub fn regulated_current(&self, volts: f64) -> f64 {
        (self.current_reg_a * volts + self.current_reg_b) / self.shunt_resistance
    }

    fn validate(&self, axis: usize) -> Result<(), CalibrationError> {
        let scales = [
            ("ticks_to_radians", self.ticks_to_radians),
            ("drive_to_volt", self.drive_to_volt),
            ("tacho_scale", self.tacho_scale),
            ("current_reg_a", self.current_reg_a),
            ("shunt_resistance", self.shunt_resistance),
            ("torque_constant", self.torque_constant),
        ];
        for (field, value) in scales {
            if !value.is_finite() {
                return Err(CalibrationError::NotFinite { axis, field });
            }
            if value == 0.0 {
                return Err(CalibrationError::ZeroScale { axis, field });
            }
        }
        for (field, value) in [
            ("tacho_offset", self.tacho_offset),
            ("current_reg_b", self.current_reg_b),
        ] {
            if !value.is_finite() {
                return Err(CalibrationError::NotFinite { axis, field });
            }
        }
        Ok(())
    }
}

/// Ordered calibration entries. The table length fixes the axis count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    axes: Vec<CalibrationEntry>,
}

impl CalibrationTable {
    /// Build a validated table.
    pub fn new(axes: Vec<CalibrationEntry>) -> Result<Self, CalibrationError> {
        let table = Self { axes };
        table.validate()?;
        Ok(table)
    }

    /// Read and validate a table from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CalibrationError> {
        let table = Self::load(path)?;
        table.validate()?;
        Ok(table)
    }

    /// Factory calibration of the six-axis reference arm.
    ///
    /// All six joints are current-controlled.
    pub fn reference() -> Self {
        const GEAR: [f64; REFERENCE_AXES] = [
            94.14706,
            -103.23529,
            51.44118,
            175.0,
            150.0,
            131.64395,
        ];
        const VEL_TO_VOLT: [f64; REFERENCE_AXES] = [
            2.5545,
            2.67804024532652,
            1.37350318088664,
            2.34300679603342,
            2.0058,
            3.3786,
        ];
        const TACHO_SCALE: [f64; REFERENCE_AXES] = [9.2750, 10.0285, 4.9633, 5.0, 5.0, 5.0];
        const TACHO_OFFSET: [f64; REFERENCE_AXES] = [0.0112, 0.0083, 0.0056, 0.0, 0.0, 0.0];
        const MOTOR_KM: [f64; REFERENCE_AXES] = [
            0.2781 * 5.77,
            0.2863 * 5.85,
            0.2887 * 5.78,
            0.07 * 5.7,
            0.07 * 5.7,
            0.07 * 5.7,
        ];
        const REG_A: [f64; REFERENCE_AXES] = [-0.7874, -0.7904, -0.7890, -0.7890, -0.7890, -0.7890];
        const REG_B: [f64; REFERENCE_AXES] = [-0.0248, 0.0091, -0.0624, -0.0624, -0.0624, -0.0624];
        const SHUNT: [f64; REFERENCE_AXES] = [0.1733, 0.1709, 0.1730, 0.1730, 0.1730, 0.1730];
        const ENCODER_OFFSET: [i64; REFERENCE_AXES] =
            [1_000_004, 1_000_000, 1_000_002, 449_784, 1_035_056, 1_230_656];

        let axes = (0..REFERENCE_AXES)
            .map(|i| CalibrationEntry {
                ticks_to_radians: 2.0 * PI / (GEAR[i] * ENCODER_TICKS_PER_REV),
                drive_to_volt: VEL_TO_VOLT[i],
                tacho_scale: TACHO_SCALE[i],
                tacho_offset: TACHO_OFFSET[i],
                current_reg_a: REG_A[i],
                current_reg_b: REG_B[i],
                shunt_resistance: SHUNT[i],
                torque_constant: MOTOR_KM[i] * GEAR[i].abs(),
                torque_controlled: true,
                encoder_offset: ENCODER_OFFSET[i],
            })
            .collect();

        Self { axes }
    }

    /// Check the axis count and every entry.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.axes.is_empty() || self.axes.len() > MAX_AXES {
            return Err(CalibrationError::AxisCount(self.axes.len()));
        }
        self.axes
            .iter()
            .enumerate()
            .try_for_each(|(axis, entry)| entry.validate(axis))
    }

    /// Number of axes.
    #[inline]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// Always false for a validated table.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Entry for `axis`.
    #[inline]
    pub fn get(&self, axis: usize) -> Option<&CalibrationEntry> {
        self.axes.get(axis)
    }

    /// Iterate entries in axis order.
    pub fn iter(&self) -> impl Iterator<Item = &CalibrationEntry> {
        self.axes.iter()
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::reference()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

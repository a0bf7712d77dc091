//! Axis implementations.
//!
//! - [`hardware`] - Joints wired to I/O boards
//! - [`simulation`] - Integrator joints and plant models
//! - [`loopback`] - In-memory I/O backend for running the hardware path
//!   without boards
//!
//! A controller gets all of its axes from [`build_axes`] in one call, so the
//! hardware/simulation choice is made exactly once.

pub mod hardware;
pub mod loopback;
pub mod simulation;

use axion_common::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use self::hardware::HardwareAxis;
use self::simulation::SimulatedAxis;

/// Inputs to [`build_axes`].
#[derive(Debug, Clone, Copy)]
pub struct AxisSetConfig<'a> {
    /// One entry per axis; fixes the axis count.
    pub calibration: &'a CalibrationTable,
    /// One entry per axis.
    pub limits: &'a [AxisLimits],
    /// Control cycle period, used as the simulation time step.
    pub cycle_time: Duration,
    /// Requested variant.
    pub simulation: bool,
    /// Channel layout for hardware axes.
    pub layout: &'a IoLayout,
}

/// The axes of one controller.
pub struct AxisSet {
    /// Axes in index order.
    pub axes: Vec<Box<dyn Axis>>,
    /// Variant actually built.
    pub variant: AxisVariant,
    /// Backend shared by hardware axes.
    pub io: Option<Arc<dyn IoBackend>>,
}

/// Build every axis of a controller.
///
/// Hardware axes need a backend. When hardware is requested without one the
/// set falls back to simulated axes.
pub fn build_axes(
    config: &AxisSetConfig<'_>,
    io: Option<Arc<dyn IoBackend>>,
) -> Result<AxisSet, HalError> {
    let count = config.calibration.len();
    if config.limits.len() != count {
        return Err(HalError::ConfigError(format!(
            "{} limit entries for {} calibrated axes",
            config.limits.len(),
            count
        )));
    }

    let io = match (config.simulation, io) {
        (false, Some(io)) => Some(io),
        (false, None) => {
            warn!("Hardware axes requested but no I/O backend available, falling back to simulation");
            None
        }
        (true, _) => None,
    };

    let axes: Vec<Box<dyn Axis>> = match &io {
        Some(io) => {
            config
                .layout
                .validate(count)
                .map_err(|e| HalError::ConfigError(format!("io layout: {e}")))?;
            config
                .calibration
                .iter()
                .zip(config.limits)
                .enumerate()
                .map(|(index, (entry, limits))| {
                    HardwareAxis::new(index, *entry, limits, Arc::clone(io), config.layout)
                        .map(|axis| Box::new(axis) as Box<dyn Axis>)
                })
                .collect::<Result<_, _>>()?
        }
        None => config
            .calibration
            .iter()
            .zip(config.limits)
            .enumerate()
            .map(|(index, (entry, limits))| {
                Box::new(SimulatedAxis::new(index, entry, limits, config.cycle_time))
                    as Box<dyn Axis>
            })
            .collect(),
    };

    let variant = if io.is_some() {
        AxisVariant::Hardware
    } else {
        AxisVariant::Simulated
    };
    info!(axes = count, %variant, "Axis set built");

    Ok(AxisSet { axes, variant, io })
}

//! Simulated joints.
//!
//! [`SimulatedAxis`] integrates the acceleration supplied by a
//! [`PlantDynamics`](axion_common::hal::dynamics::PlantDynamics) model once
//! per cycle. Two models are provided; [`plant_from_config`] picks one from
//! the `[dynamics]` section of the property file.

mod axis;
mod dynamics;

pub use axis::SimulatedAxis;
pub use dynamics::{CoupledInertia, DecoupledInertia, plant_from_config};

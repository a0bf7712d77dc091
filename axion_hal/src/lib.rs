//! # Axion HAL Library
//!
//! Axis implementations behind the [`Axis`](axion_common::hal::axis::Axis)
//! capability.
//!
//! # Module Structure
//!
//! - [`drivers`] - Axis implementations and the axis-set factory
//!   - [`drivers::hardware`] - Axes over an [`IoBackend`](axion_common::hal::io::IoBackend)
//!   - [`drivers::simulation`] - Integrator axes and plant dynamics models
//!   - [`drivers::loopback`] - In-memory I/O backend
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     axion_hal (single crate)                 │
//! │                                                              │
//! │   build_axes(simulation?) ──┬──► HardwareAxis ──► IoBackend  │
//! │                             │        (boards or LoopbackIo)  │
//! │                             └──► SimulatedAxis               │
//! │                                       ▲                      │
//! │                  PlantDynamics ───────┘ acceleration/cycle   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod drivers;

pub use crate::drivers::hardware::HardwareAxis;
pub use crate::drivers::loopback::LoopbackIo;
pub use crate::drivers::simulation::{CoupledInertia, DecoupledInertia, SimulatedAxis};
pub use crate::drivers::{AxisSet, build_axes};

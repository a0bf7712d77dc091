//! Axion Common Library
//!
//! Shared data types for every Axion workspace crate: calibration data,
//! configuration loading, the axis lifecycle state machine, the command
//! surface and notification types, and the capability traits that separate
//! the controller from hardware and simulation.
//!
//! # Module Structure
//!
//! - [`consts`] - Workspace-wide limits and defaults
//! - [`config`] - Configuration loading traits and types
//! - [`hal`] - Axis capability, calibration, I/O boundary, plant dynamics
//! - [`control_unit`] - Controller config, commands and notifications
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use axion_common::prelude::*;
//!
//! let table = CalibrationTable::reference();
//! assert_eq!(table.len(), 6);
//! ```

pub mod config;
pub mod consts;
pub mod control_unit;
pub mod hal;
pub mod prelude;

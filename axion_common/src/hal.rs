//! Axis capability layer shared between the controller and axis implementations.

pub mod axis;
pub mod calibration;
pub mod dynamics;
pub mod error;
pub mod io;
pub mod lifecycle;

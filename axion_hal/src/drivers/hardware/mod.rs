//! Joints wired to I/O boards.
//!
//! Each [`HardwareAxis`] owns a set of channel numbers resolved from the
//! [`IoLayout`](axion_common::control_unit::config::IoLayout) and shares one
//! [`IoBackend`](axion_common::hal::io::IoBackend) with the other axes.

mod axis;
mod channels;

pub use axis::HardwareAxis;
pub use channels::AxisChannels;

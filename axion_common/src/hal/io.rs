//! Boundary to the I/O boards.
//!
//! Hardware axes never touch a board directly. They read and write numbered
//! channels through an [`IoBackend`], so the same axis code runs against real
//! boards or an in-memory loopback.

use crate::hal::error::HalError;

/// Channel-level access to encoders, analog and digital I/O.
///
/// Methods take `&self`; backends synchronize internally so axes on
/// different threads can share one backend.
pub trait IoBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Raw absolute encoder count.
    fn read_encoder(&self, channel: usize) -> Result<i64, HalError>;

    /// Analog input, volts.
    fn read_analog(&self, channel: usize) -> Result<f64, HalError>;

    /// Analog output, volts.
    fn write_analog(&self, channel: usize, volts: f64) -> Result<(), HalError>;

    /// Digital output.
    fn write_digital(&self, channel: usize, on: bool) -> Result<(), HalError>;

    /// Digital input.
    fn read_digital(&self, channel: usize) -> Result<bool, HalError>;
}

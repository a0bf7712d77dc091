//! Error types for axis and I/O operations.

use crate::hal::lifecycle::TransitionError;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HalError {
    /// Axis construction failed.
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Channel index not present on the I/O backend.
    #[error("{kind} channel {channel} does not exist")]
    NoSuchChannel {
        /// Channel category ("encoder", "analog input", ...).
        kind: &'static str,
        /// Requested channel index.
        channel: usize,
    },

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Lifecycle event not allowed in the current state.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

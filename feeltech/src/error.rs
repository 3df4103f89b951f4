/*!
Error types for the device driver.
*/

use feeltech_protocol::{EncodeError, ProtocolError};
use std::time::Duration;
use thiserror::Error;

/// Result type used throughout the driver
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong talking to the generator
///
/// Nothing is retried internally. Multi-step operations (sweep setup,
/// waveform upload) are not rolled back either; re-run the whole operation
/// to recover.
#[derive(Error, Debug)]
pub enum Error {
    /// No (complete) response arrived within the read timeout
    #[error("Timed out after {0:?} waiting for the device")]
    Timeout(Duration),

    /// The device answered with something the protocol does not allow
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A value cannot be put on the wire; nothing was sent
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] EncodeError),

    /// The hardware cannot do this; nothing was sent
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The link is not in a state where the operation makes sense
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// I/O errors on the underlying port
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors opening or configuring the serial port
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl Error {
    /// Create a new unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedOperation(msg.into())
    }

    /// Create a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

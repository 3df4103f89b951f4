/*!
Error types for the wire codec.
*/

use crate::upload::UploadStage;
use thiserror::Error;

/// Result type used by the decoding functions
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// A reply from the device did not match what the protocol allows
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Reply too short to carry the status prefix
    #[error("Reply too short: expected at least {expected} bytes, got {got:?}")]
    ShortReply { expected: usize, got: Vec<u8> },

    /// Reply contained bytes outside of printable ASCII
    #[error("Reply is not ASCII: {0:?}")]
    NotAscii(Vec<u8>),

    /// The part after the status prefix was not a number
    #[error("Malformed numeric reply: {0:?}")]
    MalformedNumber(String),

    /// No line terminator within the longest reply the device sends
    #[error("Reply line exceeds {0} bytes without a terminator")]
    LineTooLong(usize),

    /// A handshake byte did not match the expected literal
    #[error("{} (expected {expected:?}, got {got:?})", .stage.failure_message())]
    UnexpectedResponse {
        stage: UploadStage,
        expected: Vec<u8>,
        got: Vec<u8>,
    },
}

/// A value cannot be represented on the wire
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Frequency must be a finite, non-negative number of hertz within the wire range, got {0}")]
    Frequency(f64),

    #[error("Duty cycle must be between 0 and 100 percent, got {0}")]
    Duty(f64),

    #[error("Amplitude must be a finite, non-negative number of volts, got {0}")]
    Amplitude(f64),

    #[error("Offset must be a finite number of volts, got {0}")]
    Offset(f64),

    #[error("Invalid channel index {0}: the device has channels 1 and 2")]
    Channel(u8),

    #[error("Invalid waveform slot {0}: slots are numbered 0 to 3")]
    Slot(u8),

    #[error("Unknown waveform code {0}")]
    Waveform(u8),

    #[error("Unknown sweep curve code {0}")]
    SweepCurve(u8),
}

impl ProtocolError {
    /// Create a handshake mismatch error
    pub fn unexpected(stage: UploadStage, expected: &[u8], got: &[u8]) -> Self {
        Self::UnexpectedResponse {
            stage,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

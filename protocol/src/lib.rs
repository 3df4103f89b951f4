/*!
# FeelTech Wire Protocol

Pure encoding and decoding for the FeelTech FY32xx two-channel waveform
generator. Nothing in this crate performs I/O; the `feeltech` crate layers
the serial transport and device state on top of it.

## Core Types

- [`ChannelId`] - Output channel selector and its command prefix
- [`Waveform`] - Built-in and arbitrary waveform kinds
- [`WaveformSlot`] - Arbitrary waveform memory bank
- [`SweepCurve`] - Sweep ramp shape
- [`Command`] - A single ASCII command line

## Modules

- [`model`] - Typed values shared by the codec and the device model
- [`command`] - ASCII command encoding and reply decoding
- [`upload`] - Binary framing of the waveform upload handshake
- [`error`] - Protocol error types
*/

pub mod command;
pub mod error;
pub mod model;
pub mod upload;

// Re-export commonly used types
pub use command::{decode_counter, decode_frequency, decode_identity, Command};
pub use error::{EncodeError, ProtocolError, Result};
pub use model::{ChannelId, SweepCurve, Waveform, WaveformSlot};
pub use upload::UploadStage;

/// Version information for the protocol library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol constants
pub mod wire {
    /// Baud rate the device listens on
    pub const BAUD_RATE: u32 = 9600;

    /// Terminator appended to every ASCII command and reply
    pub const LINE_TERMINATOR: u8 = b'\n';

    /// Longest reply line accepted before the link is treated as garbled
    pub const MAX_LINE_LEN: usize = 256;

    /// Length of the status prefix on numeric replies
    pub const STATUS_PREFIX_LEN: usize = 2;

    /// Frequencies travel in centihertz
    pub const FREQUENCY_SCALE: f64 = 100.0;

    /// Duty cycles travel in tenths of a percent
    pub const DUTY_SCALE: f64 = 10.0;

    /// The frequency counter reports in units of 10 Hz
    pub const COUNTER_FREQUENCY_SCALE: u64 = 10;

    /// Minimum gap between two commands, in milliseconds
    pub const COMMAND_INTERVAL_MS: u64 = 50;

    /// Default read timeout, in milliseconds
    pub const READ_TIMEOUT_MS: u64 = 1000;

    /// Number of arbitrary waveform slots
    pub const WAVEFORM_SLOTS: u8 = 4;
}

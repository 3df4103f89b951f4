/*!
# FeelTech FY32xx Driver

Host-side driver for FeelTech FY32xx two-channel arbitrary waveform
generators connected over a USB serial adapter.

The device speaks a line-oriented ASCII protocol for settings and a small
binary handshake for loading arbitrary waveforms. This crate wraps both
behind [`Device`], which also remembers every value it has written so
unchanged settings are not resent.

## Modules

- [`device`] - Public device and channel handles
- [`transport`] - Serial link with command pacing and timeouts
- [`cache`] - Last-written parameter values
- [`sweep`] - Channel 1 sweep configuration and state
- [`config`] - Link configuration files
- [`error`] - Driver error type

Wire encoding lives in the `feeltech-protocol` crate and is re-exported
here as [`protocol`].
*/

pub mod cache;
pub mod config;
pub mod device;
pub mod error;
pub mod sweep;
pub mod transport;
mod upload;

#[cfg(test)]
mod test_port;

pub use feeltech_protocol as protocol;

// Re-export commonly used types
pub use cache::{CachedValue, ChannelSettings};
pub use config::{DriverConfig, LinkConfig};
pub use device::{Channel, ChannelState, Device};
pub use error::{Error, Result};
pub use protocol::{ChannelId, SweepCurve, Waveform, WaveformSlot};
pub use sweep::{Sweep, SweepConfig, SweepState};
pub use transport::{Port, Transport};

/// Version information for the driver
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

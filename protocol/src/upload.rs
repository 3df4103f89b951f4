/*!
Binary framing of the arbitrary waveform upload handshake.

An upload is bracketed by two magic requests, each `DDS_WAVE` followed by a
single selector byte. The device answers every step with fixed status bytes:

| Step | Host sends | Device answers |
|---|---|---|
| clear | `DDS_WAVE`, `0xF0 + slot` | `SE` |
| open | `DDS_WAVE`, `slot` | `W` |
| sample | `u16` little-endian | 2 acknowledgment bytes |
| finish | `\n` | `N` |
*/

use crate::error::{ProtocolError, Result};
use crate::model::WaveformSlot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic prefix of both upload requests
pub const MAGIC: &[u8; 8] = b"DDS_WAVE";

/// Selector base for the clear request
pub const CLEAR_SELECTOR_BASE: u8 = 0xF0;

/// Bytes acknowledging every sample
pub const SAMPLE_ACK_LEN: usize = 2;

/// Byte closing the sample stream
pub const STREAM_TERMINATOR: u8 = b'\n';

/// Steps of the upload handshake, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStage {
    Clearing,
    Opening,
    Streaming,
    Finishing,
    Done,
}

impl UploadStage {
    /// Stage that follows this one
    pub fn next(self) -> Self {
        match self {
            Self::Clearing => Self::Opening,
            Self::Opening => Self::Streaming,
            Self::Streaming => Self::Finishing,
            Self::Finishing | Self::Done => Self::Done,
        }
    }

    /// Literal the device answers with at the end of this stage
    ///
    /// Sample acknowledgments are not checked, so `Streaming` has none.
    pub fn expected_reply(self) -> &'static [u8] {
        match self {
            Self::Clearing => b"SE",
            Self::Opening => b"W",
            Self::Finishing => b"N",
            Self::Streaming | Self::Done => b"",
        }
    }

    /// Message reported when the device answers this stage wrongly
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::Clearing => "unexpected response when clearing waveform memory",
            Self::Opening => "unexpected response when writing waveform",
            Self::Streaming => "unexpected response while streaming samples",
            Self::Finishing => "unexpected response after writing waveform",
            Self::Done => "unexpected response after upload completed",
        }
    }

    /// Compare a reply against the literal this stage expects
    pub fn check_reply(self, reply: &[u8]) -> Result<()> {
        let expected = self.expected_reply();
        if reply == expected {
            Ok(())
        } else {
            Err(ProtocolError::unexpected(self, expected, reply))
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Clearing => "clearing",
            Self::Opening => "opening",
            Self::Streaming => "streaming",
            Self::Finishing => "finishing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

fn request(selector: u8) -> [u8; 9] {
    let mut frame = [0u8; 9];
    frame[..MAGIC.len()].copy_from_slice(MAGIC);
    frame[MAGIC.len()] = selector;
    frame
}

/// Request asking the device to clear a slot
pub fn clear_request(slot: WaveformSlot) -> [u8; 9] {
    request(CLEAR_SELECTOR_BASE + slot.index())
}

/// Request opening a slot for writing
pub fn write_request(slot: WaveformSlot) -> [u8; 9] {
    request(slot.index())
}

/// Wire form of one sample
pub fn encode_sample(sample: u16) -> [u8; 2] {
    sample.to_le_bytes()
}

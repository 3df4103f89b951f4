/*!
ASCII command encoding and reply decoding.

Every command is one line of ASCII. Channel-specific commands start with the
channel prefix (`b` for channel 1, `d` for channel 2) followed by a
single-letter parameter code and the value. Sweep commands exist only under
the channel 1 prefix.
*/

use crate::error::{EncodeError, ProtocolError, Result};
use crate::model::{ChannelId, SweepCurve, Waveform};
use crate::wire::{COUNTER_FREQUENCY_SCALE, DUTY_SCALE, FREQUENCY_SCALE, STATUS_PREFIX_LEN};
use std::fmt;

/// Boundary latched by a sweep marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepBoundary {
    Start,
    End,
}

/// A single command line, before the terminator is appended
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetWaveform { channel: ChannelId, waveform: Waveform },
    SetFrequency { channel: ChannelId, centihertz: u64 },
    SetDuty { channel: ChannelId, permille: u32 },
    SetAmplitude { channel: ChannelId, volts: f64 },
    SetOffset { channel: ChannelId, volts: f64 },
    SetPhase { degrees: u16 },
    SweepMark(SweepBoundary),
    SweepTime { seconds: u32 },
    SweepCurve(SweepCurve),
    SweepRun(bool),
    QueryFrequency,
    QueryCounter,
    ClearCounter,
    QueryIdentity,
}

impl Command {
    pub fn waveform(channel: ChannelId, waveform: Waveform) -> Self {
        Self::SetWaveform { channel, waveform }
    }

    /// Frequency in hertz, sent rounded to the nearest centihertz
    pub fn frequency(channel: ChannelId, hertz: f64) -> std::result::Result<Self, EncodeError> {
        let centihertz = (hertz * FREQUENCY_SCALE).round();
        // `as u64` would saturate anything past the top of the range
        if !hertz.is_finite() || hertz < 0.0 || centihertz >= u64::MAX as f64 {
            return Err(EncodeError::Frequency(hertz));
        }
        Ok(Self::SetFrequency {
            channel,
            centihertz: centihertz as u64,
        })
    }

    /// Duty cycle in percent, sent rounded to the nearest tenth
    pub fn duty(channel: ChannelId, percent: f64) -> std::result::Result<Self, EncodeError> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(EncodeError::Duty(percent));
        }
        Ok(Self::SetDuty {
            channel,
            permille: (percent * DUTY_SCALE).round() as u32,
        })
    }

    pub fn amplitude(channel: ChannelId, volts: f64) -> std::result::Result<Self, EncodeError> {
        if !volts.is_finite() || volts < 0.0 {
            return Err(EncodeError::Amplitude(volts));
        }
        Ok(Self::SetAmplitude { channel, volts })
    }

    pub fn offset(channel: ChannelId, volts: f64) -> std::result::Result<Self, EncodeError> {
        if !volts.is_finite() {
            return Err(EncodeError::Offset(volts));
        }
        Ok(Self::SetOffset { channel, volts })
    }

    pub fn phase(degrees: u16) -> Self {
        Self::SetPhase { degrees }
    }

    /// Whether the device answers this command with a line
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Self::QueryFrequency | Self::QueryCounter | Self::QueryIdentity
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetWaveform { channel, waveform } => {
                write!(f, "{}w{}", channel.prefix(), waveform.code())
            }
            Self::SetFrequency { channel, centihertz } => {
                write!(f, "{}f{}", channel.prefix(), centihertz)
            }
            Self::SetDuty { channel, permille } => write!(f, "{}d{}", channel.prefix(), permille),
            Self::SetAmplitude { channel, volts } => {
                write!(f, "{}a{:.2}", channel.prefix(), volts)
            }
            Self::SetOffset { channel, volts } => write!(f, "{}o{:.2}", channel.prefix(), volts),
            Self::SetPhase { degrees } => write!(f, "dp{}", degrees),
            Self::SweepMark(SweepBoundary::Start) => f.write_str("bs1"),
            Self::SweepMark(SweepBoundary::End) => f.write_str("bs2"),
            Self::SweepTime { seconds } => write!(f, "bt{}", seconds),
            Self::SweepCurve(curve) => write!(f, "bm{}", curve.code()),
            Self::SweepRun(true) => f.write_str("br1"),
            Self::SweepRun(false) => f.write_str("br0"),
            Self::QueryFrequency => f.write_str("ce"),
            Self::QueryCounter => f.write_str("cc"),
            Self::ClearCounter => f.write_str("bc"),
            Self::QueryIdentity => f.write_str("a"),
        }
    }
}

/// Strip the status prefix off a numeric reply and parse the rest
fn numeric_payload(reply: &[u8]) -> Result<u64> {
    if !reply.is_ascii() {
        return Err(ProtocolError::NotAscii(reply.to_vec()));
    }
    if reply.len() < STATUS_PREFIX_LEN {
        return Err(ProtocolError::ShortReply {
            expected: STATUS_PREFIX_LEN,
            got: reply.to_vec(),
        });
    }

    let payload = String::from_utf8_lossy(&reply[STATUS_PREFIX_LEN..]);
    let payload = payload.trim();
    payload
        .parse::<u64>()
        .map_err(|_| ProtocolError::MalformedNumber(payload.to_string()))
}

/// Decode the reply to `cc` into the raw event count
pub fn decode_counter(reply: &[u8]) -> Result<u64> {
    numeric_payload(reply)
}

/// Decode the reply to `ce` into hertz
pub fn decode_frequency(reply: &[u8]) -> Result<u64> {
    let raw = numeric_payload(reply)?;
    raw.checked_mul(COUNTER_FREQUENCY_SCALE)
        .ok_or_else(|| ProtocolError::MalformedNumber(raw.to_string()))
}

/// Decode the reply to `a` into the identification string
pub fn decode_identity(reply: &[u8]) -> Result<String> {
    if !reply.is_ascii() {
        return Err(ProtocolError::NotAscii(reply.to_vec()));
    }
    Ok(String::from_utf8_lossy(reply).trim().to_string())
}

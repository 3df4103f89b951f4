/*!
Typed values shared by the command codec and the device model.
*/

use crate::error::EncodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the generator's two output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    One,
    Two,
}

impl ChannelId {
    /// Both channels in index order
    pub const ALL: [ChannelId; 2] = [ChannelId::One, ChannelId::Two];

    /// Human facing channel number (1 or 2)
    pub fn index(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Command prefix selecting this channel
    pub fn prefix(self) -> char {
        match self {
            Self::One => 'b',
            Self::Two => 'd',
        }
    }

    /// Only channel 1 has sweep hardware
    pub fn supports_sweep(self) -> bool {
        matches!(self, Self::One)
    }
}

impl TryFrom<u8> for ChannelId {
    type Error = EncodeError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(EncodeError::Channel(other)),
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.index())
    }
}

/// Waveform kinds, numbered as the device numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Waveform {
    Sine = 0,
    Square = 1,
    Triangle = 2,
    Arb1 = 3,
    Arb2 = 4,
    Arb3 = 5,
    Arb4 = 6,
    Lorentz = 7,
    Multitone = 8,
    RandomNoise = 9,
    Ecg = 10,
    Trapezoid = 11,
    Sinc = 12,
    Narrow = 13,
    GaussNoise = 14,
    Am = 15,
    Fm = 16,
}

impl Waveform {
    /// Wire code of this waveform
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The arbitrary waveform that plays back the given slot
    pub fn arb(slot: WaveformSlot) -> Self {
        match slot.index() {
            0 => Self::Arb1,
            1 => Self::Arb2,
            2 => Self::Arb3,
            _ => Self::Arb4,
        }
    }
}

impl TryFrom<u8> for Waveform {
    type Error = EncodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        use Waveform::*;
        let waveform = match code {
            0 => Sine,
            1 => Square,
            2 => Triangle,
            3 => Arb1,
            4 => Arb2,
            5 => Arb3,
            6 => Arb4,
            7 => Lorentz,
            8 => Multitone,
            9 => RandomNoise,
            10 => Ecg,
            11 => Trapezoid,
            12 => Sinc,
            13 => Narrow,
            14 => GaussNoise,
            15 => Am,
            16 => Fm,
            other => return Err(EncodeError::Waveform(other)),
        };
        Ok(waveform)
    }
}

/// Arbitrary waveform memory bank, 0 to 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WaveformSlot(u8);

impl WaveformSlot {
    /// Create a slot, rejecting indices past the last bank
    pub fn new(index: u8) -> Result<Self, EncodeError> {
        if index < crate::wire::WAVEFORM_SLOTS {
            Ok(Self(index))
        } else {
            Err(EncodeError::Slot(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for WaveformSlot {
    type Error = EncodeError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl From<WaveformSlot> for u8 {
    fn from(slot: WaveformSlot) -> u8 {
        slot.0
    }
}

/// Shape of the frequency ramp during a sweep
///
/// The wire codes follow the latest firmware revision (`Log = 1`,
/// `Linear = 2`). An earlier revision used the opposite assignment; the
/// table below is the single place to flip if hardware disagrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SweepCurve {
    Log,
    #[default]
    Linear,
}

impl SweepCurve {
    const WIRE_CODES: [(SweepCurve, u8); 2] = [(SweepCurve::Log, 1), (SweepCurve::Linear, 2)];

    /// Wire code sent with the `bm` command
    pub fn code(self) -> u8 {
        Self::WIRE_CODES
            .iter()
            .find(|(curve, _)| *curve == self)
            .map(|(_, code)| *code)
            .unwrap_or_default()
    }
}

impl TryFrom<u8> for SweepCurve {
    type Error = EncodeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::WIRE_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(curve, _)| *curve)
            .ok_or(EncodeError::SweepCurve(code))
    }
}

/*!
Channel 1 frequency sweep configuration and state.

The device latches whatever channel 1 is set to when it receives a boundary
marker (`bs1`/`bs2`), so a sweep is programmed by setting the start
frequency and duty, marking the start boundary, then doing the same for the
end boundary. The sequencing itself lives in [`crate::device::Channel`].
*/

use feeltech_protocol::{ChannelId, Command, EncodeError, SweepCurve, Waveform};
use serde::{Deserialize, Serialize};

/// Default sweep duration in seconds
pub const DEFAULT_SWEEP_SECONDS: u32 = 10;

/// Where the sweep state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepState {
    #[default]
    Stopped,
    /// Programming in progress, or a programming sequence failed halfway
    Configuring,
    Running,
}

/// Parameters of one sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Hertz
    pub start_frequency: f64,
    /// Hertz
    pub end_frequency: f64,
    /// Percent; left as is when unset
    pub start_duty: Option<f64>,
    /// Percent; left as is when unset
    pub end_duty: Option<f64>,
    /// Waveform selected before programming the boundaries
    pub waveform: Option<Waveform>,
    pub duration_secs: u32,
    pub curve: SweepCurve,
}

impl SweepConfig {
    /// Linear sweep over the default duration
    pub fn new(start_frequency: f64, end_frequency: f64) -> Self {
        Self {
            start_frequency,
            end_frequency,
            start_duty: None,
            end_duty: None,
            waveform: None,
            duration_secs: DEFAULT_SWEEP_SECONDS,
            curve: SweepCurve::default(),
        }
    }

    pub fn with_duty(mut self, start: f64, end: f64) -> Self {
        self.start_duty = Some(start);
        self.end_duty = Some(end);
        self
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = Some(waveform);
        self
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration_secs = seconds;
        self
    }

    pub fn with_curve(mut self, curve: SweepCurve) -> Self {
        self.curve = curve;
        self
    }

    /// Check every value can be encoded, before anything is sent
    pub fn validate(&self) -> Result<(), EncodeError> {
        let channel = ChannelId::One;
        Command::frequency(channel, self.start_frequency)?;
        Command::frequency(channel, self.end_frequency)?;
        for duty in [self.start_duty, self.end_duty].into_iter().flatten() {
            Command::duty(channel, duty)?;
        }
        Ok(())
    }
}

/// Sweep hardware of channel 1
#[derive(Debug, Clone, Default)]
pub struct Sweep {
    state: SweepState,
    active: Option<SweepConfig>,
}

impl Sweep {
    pub fn state(&self) -> SweepState {
        self.state
    }

    /// Configuration of the running sweep
    pub fn active(&self) -> Option<&SweepConfig> {
        self.active.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state == SweepState::Running
    }

    pub(crate) fn stopped(&mut self) {
        self.state = SweepState::Stopped;
        self.active = None;
    }

    pub(crate) fn configuring(&mut self) {
        self.state = SweepState::Configuring;
        self.active = None;
    }

    pub(crate) fn running(&mut self, config: SweepConfig) {
        self.state = SweepState::Running;
        self.active = Some(config);
    }
}

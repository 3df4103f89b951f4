/*!
Device facade.

[`Device`] owns the serial link and the cached state of both channels.
Channel settings are reached through a short-lived [`Channel`] handle:

```no_run
use feeltech::{ChannelId, Device, LinkConfig, SweepConfig, Waveform};

let mut device = Device::open(&LinkConfig::new("/dev/ttyUSB0"))?;

let mut ch1 = device.channel(ChannelId::One);
ch1.set_waveform(Waveform::Sine)?;
ch1.set_frequency(1_000.0)?;
ch1.set_amplitude(2.5)?;
ch1.start_sweep(&SweepConfig::new(100.0, 200.0).with_duration(5))?;

println!("counter reads {} Hz", device.frequency()?);
device.close()?;
# Ok::<(), feeltech::Error>(())
```

Setters only talk to the device when the value differs from the last one
written; getters never talk to the device at all.
*/

use crate::cache::{CachedValue, ChannelSettings, DeviceSettings};
use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::sweep::{Sweep, SweepConfig};
use crate::transport::{Port, Transport};
use crate::upload;
use feeltech_protocol::command::SweepBoundary;
use feeltech_protocol::wire::BAUD_RATE;
use feeltech_protocol::{
    decode_counter, decode_frequency, decode_identity, ChannelId, Command, Waveform, WaveformSlot,
};
use serialport::SerialPort;
use std::fmt::Debug;
use tracing::{debug, info};

/// Cached state of one output channel
#[derive(Debug, Clone)]
pub struct ChannelState {
    id: ChannelId,
    settings: ChannelSettings,
    sweep: Option<Sweep>,
}

impl ChannelState {
    fn new(id: ChannelId) -> Self {
        Self {
            id,
            settings: ChannelSettings::default(),
            sweep: id.supports_sweep().then(Sweep::default),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Sweep state; `None` on channel 2, which has no sweep hardware
    pub fn sweep(&self) -> Option<&Sweep> {
        self.sweep.as_ref()
    }
}

/// One FY32xx generator on an exclusively owned serial link
#[derive(Debug)]
pub struct Device<P: Port = Box<dyn SerialPort>> {
    transport: Transport<P>,
    channels: [ChannelState; 2],
    settings: DeviceSettings,
}

impl Device {
    /// Open the serial port described by `config`
    pub fn open(config: &LinkConfig) -> Result<Self> {
        let port = serialport::new(&config.port, BAUD_RATE)
            .timeout(config.read_timeout())
            .open()?;
        info!("Opened {} at {} baud", config.port, BAUD_RATE);

        Ok(Self::new(Transport::with_config(port, config)))
    }
}

impl<P: Port> Device<P> {
    /// Build a device on an already configured transport
    pub fn new(transport: Transport<P>) -> Self {
        Self {
            transport,
            channels: [
                ChannelState::new(ChannelId::One),
                ChannelState::new(ChannelId::Two),
            ],
            settings: DeviceSettings::default(),
        }
    }

    pub fn transport(&self) -> &Transport<P> {
        &self.transport
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Close the serial link. Later calls that need the link fail with
    /// `InvalidState`, as does closing twice.
    pub fn close(&mut self) -> Result<()> {
        if !self.transport.close() {
            return Err(Error::invalid_state("serial link is already closed"));
        }
        info!("Closed waveform generator link");
        Ok(())
    }

    fn slot_of(id: ChannelId) -> usize {
        match id {
            ChannelId::One => 0,
            ChannelId::Two => 1,
        }
    }

    /// Handle for reading and changing one channel
    pub fn channel(&mut self, id: ChannelId) -> Channel<'_, P> {
        Channel {
            state: &mut self.channels[Self::slot_of(id)],
            transport: &mut self.transport,
        }
    }

    /// Cached state of a channel, without borrowing the link
    pub fn channel_state(&self, id: ChannelId) -> &ChannelState {
        &self.channels[Self::slot_of(id)]
    }

    /// Last phase written, in degrees
    pub fn phase(&self) -> Option<u16> {
        self.settings.phase.get()
    }

    /// Phase between the two outputs, in degrees
    pub fn set_phase(&mut self, degrees: u16) -> Result<()> {
        let transport = &mut self.transport;
        let sent = self
            .settings
            .phase
            .write_if_changed(degrees, |d| transport.send_command(&Command::phase(d)))?;
        if !sent {
            debug!("Phase already {} degrees, not resent", degrees);
        }
        Ok(())
    }

    /// Reset every cached value to unknown, e.g. after the front panel was used
    pub fn forget_cache(&mut self) {
        for channel in &mut self.channels {
            channel.settings.forget();
        }
        self.settings.forget();
        debug!("Parameter cache cleared");
    }

    /// Identification string of the device
    pub fn device_type(&mut self) -> Result<String> {
        let reply = self.transport.exchange(&Command::QueryIdentity)?;
        Ok(decode_identity(&reply)?)
    }

    /// Frequency measured by the counter input, in hertz
    pub fn frequency(&mut self) -> Result<u64> {
        let reply = self.transport.exchange(&Command::QueryFrequency)?;
        let hertz = decode_frequency(&reply)?;
        debug!("Counter frequency: {} Hz", hertz);
        Ok(hertz)
    }

    /// Events counted by the counter input
    pub fn counter(&mut self) -> Result<u64> {
        let reply = self.transport.exchange(&Command::QueryCounter)?;
        let count = decode_counter(&reply)?;
        debug!("Counter value: {}", count);
        Ok(count)
    }

    /// Reset the event counter; the device does not answer
    pub fn clear_counter(&mut self) -> Result<()> {
        self.transport.send_command(&Command::ClearCounter)
    }

    /// Write samples into one of the arbitrary waveform slots
    ///
    /// Select the slot for playback with [`Waveform::arb`].
    pub fn upload_waveform(&mut self, slot: WaveformSlot, samples: &[u16]) -> Result<()> {
        upload::upload_waveform(&mut self.transport, slot, samples)
    }
}

/// Borrowed handle to one output channel
pub struct Channel<'d, P: Port> {
    state: &'d mut ChannelState,
    transport: &'d mut Transport<P>,
}

impl<'d, P: Port> Channel<'d, P> {
    pub fn id(&self) -> ChannelId {
        self.state.id
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.state.settings
    }

    /// Send `command` unless the cached field already holds `value`
    fn write<T>(
        &mut self,
        field: fn(&mut ChannelSettings) -> &mut CachedValue<T>,
        value: T,
        command: Command,
    ) -> Result<()>
    where
        T: Copy + PartialEq + Debug,
    {
        let transport = &mut *self.transport;
        let sent = field(&mut self.state.settings)
            .write_if_changed(value, |_| transport.send_command(&command))?;
        if !sent {
            debug!("{} already at {:?}, `{}` not resent", self.state.id, value, command);
        }
        Ok(())
    }

    pub fn waveform(&self) -> Option<Waveform> {
        self.state.settings.waveform.get()
    }

    pub fn set_waveform(&mut self, waveform: Waveform) -> Result<()> {
        let command = Command::waveform(self.id(), waveform);
        self.write(|s| &mut s.waveform, waveform, command)
    }

    /// Hertz
    pub fn frequency(&self) -> Option<f64> {
        self.state.settings.frequency.get()
    }

    pub fn set_frequency(&mut self, hertz: f64) -> Result<()> {
        let command = Command::frequency(self.id(), hertz)?;
        self.write(|s| &mut s.frequency, hertz, command)
    }

    /// Percent
    pub fn duty(&self) -> Option<f64> {
        self.state.settings.duty.get()
    }

    pub fn set_duty(&mut self, percent: f64) -> Result<()> {
        let command = Command::duty(self.id(), percent)?;
        self.write(|s| &mut s.duty, percent, command)
    }

    /// Volts
    pub fn amplitude(&self) -> Option<f64> {
        self.state.settings.amplitude.get()
    }

    pub fn set_amplitude(&mut self, volts: f64) -> Result<()> {
        let command = Command::amplitude(self.id(), volts)?;
        self.write(|s| &mut s.amplitude, volts, command)
    }

    /// Volts
    pub fn offset(&self) -> Option<f64> {
        self.state.settings.offset.get()
    }

    pub fn set_offset(&mut self, volts: f64) -> Result<()> {
        let command = Command::offset(self.id(), volts)?;
        self.write(|s| &mut s.offset, volts, command)
    }

    /// Sweep state; `None` on channel 2
    pub fn sweep(&self) -> Option<&Sweep> {
        self.state.sweep.as_ref()
    }

    fn sweep_mut(&mut self) -> Result<&mut Sweep> {
        let id = self.state.id;
        self.state
            .sweep
            .as_mut()
            .ok_or_else(|| Error::unsupported(format!("{} has no sweep, only CH1 does", id)))
    }

    /// Program and start a frequency sweep
    ///
    /// Any running sweep is stopped first. The boundary markers are sent
    /// straight after the frequency and duty of their boundary, because the
    /// device latches the current setting when it sees the marker. Boundary
    /// values are always sent, even when the cache already holds them.
    pub fn start_sweep(&mut self, config: &SweepConfig) -> Result<()> {
        self.sweep_mut()?;
        config.validate()?;

        self.stop_sweep()?;
        self.sweep_mut()?.configuring();

        if let Some(waveform) = config.waveform {
            self.set_waveform(waveform)?;
        }
        self.program_boundary(config.start_frequency, config.start_duty, SweepBoundary::Start)?;
        self.program_boundary(config.end_frequency, config.end_duty, SweepBoundary::End)?;
        self.transport.send_command(&Command::SweepTime {
            seconds: config.duration_secs,
        })?;
        self.transport
            .send_command(&Command::SweepCurve(config.curve))?;
        self.transport.send_command(&Command::SweepRun(true))?;

        self.sweep_mut()?.running(config.clone());
        info!(
            "Sweep running: {} Hz -> {} Hz over {} s ({:?})",
            config.start_frequency, config.end_frequency, config.duration_secs, config.curve
        );
        Ok(())
    }

    fn program_boundary(
        &mut self,
        hertz: f64,
        duty: Option<f64>,
        boundary: SweepBoundary,
    ) -> Result<()> {
        let id = self.id();
        let transport = &mut *self.transport;
        let settings = &mut self.state.settings;

        let command = Command::frequency(id, hertz)?;
        settings
            .frequency
            .write_always(hertz, |_| transport.send_command(&command))?;
        if let Some(percent) = duty {
            let command = Command::duty(id, percent)?;
            settings
                .duty
                .write_always(percent, |_| transport.send_command(&command))?;
        }
        transport.send_command(&Command::SweepMark(boundary))
    }

    /// Stop the sweep. Always sent, even if no sweep is known to be running.
    pub fn stop_sweep(&mut self) -> Result<()> {
        self.sweep_mut()?;
        self.transport.send_command(&Command::SweepRun(false))?;
        self.sweep_mut()?.stopped();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SweepState;
    use crate::test_port::{init_tracing, ScriptedPort};
    use feeltech_protocol::{EncodeError, SweepCurve};

    fn device(port: ScriptedPort) -> Device<ScriptedPort> {
        Device::new(port.into_transport())
    }

    fn lines(device: &Device<ScriptedPort>) -> Vec<String> {
        device.transport().get_ref().unwrap().lines()
    }

    #[test]
    fn test_setters_encode_per_channel() {
        let mut device = device(ScriptedPort::new());

        let mut ch1 = device.channel(ChannelId::One);
        ch1.set_waveform(Waveform::Triangle).unwrap();
        ch1.set_frequency(1234.5).unwrap();
        ch1.set_duty(25.0).unwrap();
        ch1.set_amplitude(3.3).unwrap();
        ch1.set_offset(-1.0).unwrap();

        let mut ch2 = device.channel(ChannelId::Two);
        ch2.set_waveform(Waveform::arb(WaveformSlot::new(1).unwrap())).unwrap();
        ch2.set_frequency(50.0).unwrap();

        device.set_phase(180).unwrap();

        assert_eq!(
            lines(&device),
            vec!["bw2", "bf123450", "bd250", "ba3.30", "bo-1.00", "dw4", "df5000", "dp180"]
        );
    }

    #[test]
    fn test_repeated_set_is_sent_once() {
        let mut device = device(ScriptedPort::new());

        for id in ChannelId::ALL {
            let mut channel = device.channel(id);
            channel.set_frequency(440.0).unwrap();
            channel.set_frequency(440.0).unwrap();
            channel.set_duty(50.0).unwrap();
            channel.set_duty(50.0).unwrap();
            channel.set_waveform(Waveform::Square).unwrap();
            channel.set_waveform(Waveform::Square).unwrap();
            channel.set_amplitude(1.0).unwrap();
            channel.set_amplitude(1.0).unwrap();
            channel.set_offset(0.0).unwrap();
            channel.set_offset(0.0).unwrap();
        }
        device.set_phase(90).unwrap();
        device.set_phase(90).unwrap();

        assert_eq!(
            lines(&device),
            vec![
                "bf44000", "bd500", "bw1", "ba1.00", "bo0.00", "df44000", "dd500", "dw1", "da1.00",
                "do0.00", "dp90",
            ]
        );
    }

    #[test]
    fn test_getters_return_cached_values() {
        let mut device = device(ScriptedPort::new());

        assert_eq!(device.channel(ChannelId::One).frequency(), None);
        assert_eq!(device.phase(), None);

        device.channel(ChannelId::One).set_frequency(10.0).unwrap();
        device.channel(ChannelId::Two).set_amplitude(4.5).unwrap();

        assert_eq!(device.channel(ChannelId::One).frequency(), Some(10.0));
        assert_eq!(device.channel(ChannelId::Two).frequency(), None);
        assert_eq!(
            device.channel_state(ChannelId::Two).settings().amplitude.get(),
            Some(4.5)
        );
        // reads never touch the link
        assert_eq!(lines(&device).len(), 2);
    }

    #[test]
    fn test_invalid_value_sends_nothing() {
        let mut device = device(ScriptedPort::new());

        let err = device.channel(ChannelId::One).set_duty(120.0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(EncodeError::Duty(_))));
        assert!(device.channel(ChannelId::One).duty().is_none());
        assert!(lines(&device).is_empty());
    }

    #[test]
    fn test_forget_cache_forces_resend() {
        let mut device = device(ScriptedPort::new());
        device.channel(ChannelId::One).set_frequency(1.0).unwrap();
        device.set_phase(10).unwrap();

        device.forget_cache();
        device.channel(ChannelId::One).set_frequency(1.0).unwrap();
        device.set_phase(10).unwrap();

        assert_eq!(lines(&device), vec!["bf100", "dp10", "bf100", "dp10"]);
    }

    #[test]
    fn test_sweep_command_order() {
        init_tracing();
        let mut device = device(ScriptedPort::new());

        let config = SweepConfig::new(100.0, 200.0)
            .with_duration(5)
            .with_curve(SweepCurve::Linear);
        device.channel(ChannelId::One).start_sweep(&config).unwrap();

        assert_eq!(
            lines(&device),
            vec!["br0", "bf10000", "bs1", "bf20000", "bs2", "bt5", "bm2", "br1"]
        );

        let sweep = device.channel_state(ChannelId::One).sweep().unwrap();
        assert_eq!(sweep.state(), SweepState::Running);
        assert_eq!(sweep.active(), Some(&config));
        assert_eq!(device.channel(ChannelId::One).frequency(), Some(200.0));
    }

    #[test]
    fn test_sweep_with_duty_and_waveform() {
        let mut device = device(ScriptedPort::new());

        let config = SweepConfig::new(1.0, 2.0)
            .with_duty(10.0, 90.0)
            .with_waveform(Waveform::Square)
            .with_curve(SweepCurve::Log);
        device.channel(ChannelId::One).start_sweep(&config).unwrap();

        assert_eq!(
            lines(&device),
            vec!["br0", "bw1", "bf100", "bd100", "bs1", "bf200", "bd900", "bs2", "bt10", "bm1", "br1"]
        );
    }

    #[test]
    fn test_sweep_resends_cached_boundaries() {
        let mut device = device(ScriptedPort::new());
        let mut ch1 = device.channel(ChannelId::One);
        ch1.set_frequency(100.0).unwrap();
        ch1.set_duty(10.0).unwrap();

        ch1.start_sweep(&SweepConfig::new(100.0, 200.0).with_duty(10.0, 50.0))
            .unwrap();

        assert_eq!(
            lines(&device),
            vec![
                "bf10000", "bd100", "br0", "bf10000", "bd100", "bs1", "bf20000", "bd500", "bs2",
                "bt10", "bm2", "br1",
            ]
        );
    }

    #[test]
    fn test_back_to_back_sweeps() {
        let mut device = device(ScriptedPort::new());
        let mut ch1 = device.channel(ChannelId::One);
        ch1.start_sweep(&SweepConfig::new(100.0, 200.0)).unwrap();
        ch1.start_sweep(&SweepConfig::new(200.0, 300.0)).unwrap();

        let sent = lines(&device);
        assert_eq!(
            sent[8..],
            ["br0", "bf20000", "bs1", "bf30000", "bs2", "bt10", "bm2", "br1"]
        );
        assert_eq!(device.channel(ChannelId::One).frequency(), Some(300.0));
    }

    #[test]
    fn test_stop_sweep() {
        let mut device = device(ScriptedPort::new());
        let mut ch1 = device.channel(ChannelId::One);
        ch1.start_sweep(&SweepConfig::new(1.0, 2.0)).unwrap();
        ch1.stop_sweep().unwrap();

        assert_eq!(ch1.sweep().unwrap().state(), SweepState::Stopped);
        assert_eq!(lines(&device).last().map(String::as_str), Some("br0"));
    }

    #[test]
    fn test_sweep_on_channel_two_is_unsupported() {
        let mut device = device(ScriptedPort::new());
        let mut ch2 = device.channel(ChannelId::Two);

        let err = ch2.start_sweep(&SweepConfig::new(100.0, 200.0)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
        assert!(matches!(ch2.stop_sweep(), Err(Error::UnsupportedOperation(_))));
        assert!(ch2.sweep().is_none());

        assert!(device.transport().get_ref().unwrap().written().is_empty());
    }

    #[test]
    fn test_invalid_sweep_sends_nothing() {
        let mut device = device(ScriptedPort::new());

        let err = device
            .channel(ChannelId::One)
            .start_sweep(&SweepConfig::new(100.0, f64::NAN))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(lines(&device).is_empty());
    }

    #[test]
    fn test_failed_sweep_stays_configuring() {
        // br0, bf100 and bs1 go out, then the link drops
        let mut device = device(ScriptedPort::new().with_write_limit(3));

        let err = device
            .channel(ChannelId::One)
            .start_sweep(&SweepConfig::new(1.0, 2.0))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(lines(&device), vec!["br0", "bf100", "bs1"]);

        let sweep = device.channel_state(ChannelId::One).sweep().unwrap();
        assert_eq!(sweep.state(), SweepState::Configuring);
        assert!(sweep.active().is_none());
    }

    #[test]
    fn test_sweep_on_closed_link_keeps_state() {
        let mut device = device(ScriptedPort::new());
        device.channel(ChannelId::One).start_sweep(&SweepConfig::new(1.0, 2.0)).unwrap();
        device.close().unwrap();

        let err = device
            .channel(ChannelId::One)
            .start_sweep(&SweepConfig::new(3.0, 4.0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(
            device.channel_state(ChannelId::One).sweep().unwrap().state(),
            SweepState::Running
        );
    }

    #[test]
    fn test_counter_queries() {
        let port = ScriptedPort::with_replies([
            &b"ce00012345\n"[..],
            &b"cc0000042\n"[..],
            &b""[..],
            &b"FY3224S\n"[..],
        ]);
        let mut device = device(port);

        assert_eq!(device.frequency().unwrap(), 123_450);
        assert_eq!(device.counter().unwrap(), 42);
        device.clear_counter().unwrap();
        assert_eq!(device.device_type().unwrap(), "FY3224S");

        assert_eq!(lines(&device), vec!["ce", "cc", "bc", "a"]);
    }

    #[test]
    fn test_queries_time_out() {
        let mut device = device(ScriptedPort::new());

        assert!(device.frequency().unwrap_err().is_timeout());
        assert!(device.counter().unwrap_err().is_timeout());
        assert!(device.device_type().unwrap_err().is_timeout());
    }

    #[test]
    fn test_malformed_counter_reply() {
        let mut device = device(ScriptedPort::with_replies([&b"ccerr\n"[..]]));

        assert!(device.counter().unwrap_err().is_protocol());
    }

    #[test]
    fn test_upload_through_facade() {
        let port = ScriptedPort::with_replies([&b"SE"[..], &b"W"[..], &b"OK"[..], &b"N"[..]]);
        let mut device = device(port);

        device
            .upload_waveform(WaveformSlot::new(2).unwrap(), &[0x0102])
            .unwrap();
        assert_eq!(
            device.transport().get_ref().unwrap().written(),
            b"DDS_WAVE\xF2DDS_WAVE\x02\x02\x01\n".to_vec()
        );
    }

    #[test]
    fn test_closed_device() {
        let mut device = device(ScriptedPort::new());
        device.close().unwrap();

        assert!(!device.is_open());
        assert!(matches!(device.close(), Err(Error::InvalidState(_))));
        assert!(matches!(device.counter(), Err(Error::InvalidState(_))));
        assert!(matches!(device.set_phase(1), Err(Error::InvalidState(_))));
        assert!(matches!(
            device.channel(ChannelId::One).set_frequency(1.0),
            Err(Error::InvalidState(_))
        ));
        // a failed write leaves the cache as it was
        assert_eq!(device.channel(ChannelId::One).frequency(), None);
    }
}

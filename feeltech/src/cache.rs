/*!
Last-known parameter values.

The device protocol has no way to read most settings back, so the driver
remembers what it last wrote. A write of an unchanged value is suppressed,
and reads are served from here without touching the link.
*/

use feeltech_protocol::Waveform;

/// A setting that is either unknown or holds the last value written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedValue<T>(Option<T>);

impl<T> CachedValue<T> {
    /// Nothing written yet
    pub const fn unknown() -> Self {
        Self(None)
    }

    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }

    /// Back to unknown, so the next write is always sent
    pub fn forget(&mut self) {
        self.0 = None;
    }
}

impl<T: Copy + PartialEq> CachedValue<T> {
    pub fn get(&self) -> Option<T> {
        self.0
    }

    /// Run `write` unless `value` equals the cached value, and record
    /// `value` once `write` has succeeded.
    ///
    /// Returns whether `write` ran.
    pub fn write_if_changed<E>(
        &mut self,
        value: T,
        write: impl FnOnce(T) -> Result<(), E>,
    ) -> Result<bool, E> {
        if self.0 == Some(value) {
            return Ok(false);
        }
        self.write_always(value, write)?;
        Ok(true)
    }

    /// Run `write` regardless of the cached value, and record `value` once
    /// it has succeeded
    pub fn write_always<E>(
        &mut self,
        value: T,
        write: impl FnOnce(T) -> Result<(), E>,
    ) -> Result<(), E> {
        write(value)?;
        self.0 = Some(value);
        Ok(())
    }
}

impl<T> Default for CachedValue<T> {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Cached settings of one output channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSettings {
    pub waveform: CachedValue<Waveform>,
    /// Hertz
    pub frequency: CachedValue<f64>,
    /// Percent
    pub duty: CachedValue<f64>,
    /// Volts
    pub amplitude: CachedValue<f64>,
    /// Volts
    pub offset: CachedValue<f64>,
}

impl ChannelSettings {
    pub fn forget(&mut self) {
        self.waveform.forget();
        self.frequency.forget();
        self.duty.forget();
        self.amplitude.forget();
        self.offset.forget();
    }
}

/// Cached device-wide settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSettings {
    /// Phase between the two channels, in degrees
    pub phase: CachedValue<u16>,
}

impl DeviceSettings {
    pub fn forget(&mut self) {
        self.phase.forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unknown() {
        let settings = ChannelSettings::default();
        assert_eq!(settings.frequency.get(), None);
        assert!(!settings.waveform.is_known());
    }

    #[test]
    fn test_unchanged_value_is_not_written() {
        let mut cached = CachedValue::unknown();
        let mut writes = Vec::new();

        for value in [1.5, 1.5, 2.0, 2.0, 1.5] {
            cached
                .write_if_changed(value, |v| {
                    writes.push(v);
                    Ok::<_, ()>(())
                })
                .unwrap();
        }

        assert_eq!(writes, vec![1.5, 2.0, 1.5]);
        assert_eq!(cached.get(), Some(1.5));
    }

    #[test]
    fn test_failed_write_leaves_cache_untouched() {
        let mut cached = CachedValue::unknown();
        cached.write_if_changed(10u16, |_| Ok::<_, &str>(())).unwrap();

        let result = cached.write_if_changed(20u16, |_| Err("link down"));
        assert_eq!(result, Err("link down"));
        assert_eq!(cached.get(), Some(10));
    }

    #[test]
    fn test_write_always_ignores_cached_value() {
        let mut cached = CachedValue::unknown();
        let mut writes = 0;

        for _ in 0..2 {
            cached
                .write_always(3u16, |_| {
                    writes += 1;
                    Ok::<_, ()>(())
                })
                .unwrap();
        }

        assert_eq!(writes, 2);
        assert_eq!(cached.get(), Some(3));
        assert_eq!(cached.write_always(4u16, |_| Err("link down")), Err("link down"));
        assert_eq!(cached.get(), Some(3));
    }

    #[test]
    fn test_forget_resets_everything() {
        let mut settings = ChannelSettings::default();
        settings.amplitude.write_if_changed(1.0, |_| Ok::<_, ()>(())).unwrap();
        settings.waveform.write_if_changed(Waveform::Sine, |_| Ok::<_, ()>(())).unwrap();

        settings.forget();
        assert_eq!(settings, ChannelSettings::default());
    }
}

#[cfg(feature = "defmt")]
use defmt::Format;

/// Bus address with both strap pins low.
pub const BASE_ADDRESS: u8 = 0x34;

/// Address selected by the two strap pins, `true` meaning pulled high.
/// Usable in the initializer of a `static` [`PackMonitor`].
///
/// [`PackMonitor`]: crate::monitor::PackMonitor
pub const fn address_from_straps(a0: bool, a1: bool) -> u8 {
    BASE_ADDRESS | a0 as u8 | (a1 as u8) << 1
}

/// Closed interval a reading must fall in to be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct PlausibleRange {
    pub min: f32,
    pub max: f32,
}

impl PlausibleRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// `false` for NaN.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Consecutive out-of-limit cycles tolerated before an alarm fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct AlarmThresholds {
    pub temperature: u16,
    pub voltage: u16,
    pub current: u16,
}

impl Default for AlarmThresholds {
    fn default() -> Self {
        Self {
            temperature: 20,
            voltage: 20,
            current: 5,
        }
    }
}

/// Build-time settings of the monitor. Host-writable limits live in the
/// register map instead.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct MonitorConfig {
    /// Sampling period of the measurement cycle (ms)
    pub sample_period_ms: u32,
    /// Alarm window length, also the persistence period (ms)
    pub window_ms: u32,
    pub thresholds: AlarmThresholds,
    /// °C
    pub temperature_range: PlausibleRange,
    /// A
    pub current_range: PlausibleRange,
    /// V
    pub pack_range: PlausibleRange,
    /// V
    pub bus_band: PlausibleRange,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 100,
            window_ms: 5000,
            thresholds: AlarmThresholds::default(),
            temperature_range: PlausibleRange::new(-30.0, 70.0),
            current_range: PlausibleRange::new(-30.0, 30.0),
            pack_range: PlausibleRange::new(8.0, 20.0),
            bus_band: PlausibleRange::new(4.70, 5.10),
        }
    }
}

//! Per-cycle conversion, classification and debounced alarms.

use bitflags::bitflags;
use uom::si::{electric_current::ampere, electric_potential::volt};

#[cfg(feature = "defmt")]
use defmt::Format;

use crate::cache::StorageCache;
use crate::config::{AlarmThresholds, MonitorConfig};
use crate::registers::{Config0Flags, Register, Status0Flags, Status1Flags};
use crate::sensors::{Samples, ThermistorChannel};
use crate::thermistor;
use crate::units::{ElectricCurrent, ElectricPotential, ThermodynamicTemperature};

/// °C below the high limit (or above the low limit) that raises a warning.
pub const TEMPERATURE_WARN_MARGIN: f32 = 2.0;
/// A below the high limit that raises a warning.
pub const CURRENT_WARN_MARGIN: f32 = 1.0;
/// V inside either pack limit that raises a warning.
pub const VOLTAGE_WARN_MARGIN: f32 = 0.25;

const MS_PER_HOUR: f32 = 3_600_000.0;

/// Alarm condition. The discriminant is the code stored in LastTripReason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
#[repr(u8)]
pub enum AlarmKind {
    OverCurrent = 1,
    UnderVoltage = 2,
    OverVoltage = 3,
    UnderTemperature = 4,
    OverTemperature = 5,
}

/// When a counter goes back to zero after firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum ResetPolicy {
    /// Restart counting immediately after firing.
    ResetOnFire,
    /// Fire at most once per window; only the window boundary resets.
    ResetAtWindow,
}

impl AlarmKind {
    pub const ALL: [AlarmKind; 5] = [
        Self::OverCurrent,
        Self::UnderVoltage,
        Self::OverVoltage,
        Self::UnderTemperature,
        Self::OverTemperature,
    ];

    fn index(self) -> usize {
        self as usize - 1
    }

    pub fn policy(self) -> ResetPolicy {
        match self {
            Self::UnderVoltage | Self::OverVoltage => ResetPolicy::ResetAtWindow,
            _ => ResetPolicy::ResetOnFire,
        }
    }

    /// CONFIG0 bit enabling this category.
    pub fn enable_flag(self) -> Config0Flags {
        match self {
            Self::OverCurrent => Config0Flags::OVER_CURRENT,
            Self::UnderVoltage => Config0Flags::UNDER_VOLTAGE,
            Self::OverVoltage => Config0Flags::OVER_VOLTAGE,
            Self::UnderTemperature => Config0Flags::UNDER_TEMPERATURE,
            Self::OverTemperature => Config0Flags::OVER_TEMPERATURE,
        }
    }

    pub fn trip_register(self) -> Register {
        match self {
            Self::OverCurrent => Register::OverCurrentTrips,
            Self::UnderVoltage => Register::UnderVoltageTrips,
            Self::OverVoltage => Register::OverVoltageTrips,
            Self::UnderTemperature => Register::UnderTempTrips,
            Self::OverTemperature => Register::OverTempTrips,
        }
    }

    pub fn threshold(self, thresholds: &AlarmThresholds) -> u16 {
        match self {
            Self::OverCurrent => thresholds.current,
            Self::UnderVoltage | Self::OverVoltage => thresholds.voltage,
            Self::UnderTemperature | Self::OverTemperature => thresholds.temperature,
        }
    }

    fn flag(self) -> AlarmSet {
        AlarmSet::from_bits_retain(1 << self.index())
    }
}

bitflags! {
    /// A set of [`AlarmKind`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AlarmSet: u8 {
        const OVER_CURRENT = 1 << 0;
        const UNDER_VOLTAGE = 1 << 1;
        const OVER_VOLTAGE = 1 << 2;
        const UNDER_TEMPERATURE = 1 << 3;
        const OVER_TEMPERATURE = 1 << 4;
    }
}

impl AlarmSet {
    pub fn has(&self, kind: AlarmKind) -> bool {
        self.contains(kind.flag())
    }

    pub fn insert_kind(&mut self, kind: AlarmKind) {
        self.insert(kind.flag());
    }
}

/// Consecutive-cycle counter for one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmCounter {
    count: u16,
    fired: bool,
}

impl AlarmCounter {
    pub fn count(&self) -> u16 {
        self.count
    }

    fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn check(&mut self, threshold: u16, policy: ResetPolicy) -> bool {
        if self.count <= threshold {
            return false;
        }
        match policy {
            ResetPolicy::ResetOnFire => {
                self.count = 0;
                true
            }
            ResetPolicy::ResetAtWindow => !core::mem::replace(&mut self.fired, true),
        }
    }
}

/// Converted values of one cycle. Channels with a non-finite quotient read 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    pub temperatures: [ThermodynamicTemperature; 3],
    pub bus_voltage: ElectricPotential,
    pub load_current: ElectricCurrent,
    pub pack_voltage: ElectricPotential,
}

/// Outcome of one measurement cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub timestamp: u32,
    pub status0: Status0Flags,
    pub status1: Status1Flags,
    /// Alarms that fired this cycle
    pub alarms: AlarmSet,
    pub readings: Readings,
}

impl CycleReport {
    pub fn warnings(&self) -> Status0Flags {
        self.status0
            & (Status0Flags::WARN_TEMPERATURE
                | Status0Flags::WARN_CURRENT
                | Status0Flags::WARN_VOLTAGE)
    }

    pub fn range_errors(&self) -> Status0Flags {
        self.status0
            & (Status0Flags::RANGE_TEMPERATURE
                | Status0Flags::RANGE_CURRENT
                | Status0Flags::RANGE_VOLTAGE)
    }
}

// Host-writable limits, read from the cache at the start of each cycle.
struct Limits {
    high_current: f32,
    high_temp: f32,
    low_temp: f32,
    high_volt: f32,
    low_volt: f32,
    mv_per_amp: f32,
    pack_divisor: f32,
    bus_divisor: f32,
}

impl Limits {
    fn from_cache(cache: &StorageCache) -> Self {
        Self {
            high_current: cache.get(Register::HighCurrentLimit),
            high_temp: cache.get(Register::HighTempLimit),
            low_temp: cache.get(Register::LowTempLimit),
            high_volt: cache.get(Register::HighVoltLimit),
            low_volt: cache.get(Register::LowVoltLimit),
            mv_per_amp: cache.get(Register::CurrentMvPerAmp),
            pack_divisor: cache.get(Register::PackVoltDivisor),
            bus_divisor: cache.get(Register::BusVoltDivisor),
        }
    }
}

fn quotient(numerator: f32, divisor: f32) -> Option<f32> {
    let value = numerator / divisor;
    value.is_finite().then_some(value)
}

// 0.0 marks an unset memory.
fn lower(cache: &mut StorageCache, register: Register, value: f32, now: u32) -> bool {
    let current: f32 = cache.get(register);
    if current == 0.0 || value < current {
        cache.set(register, now, value);
        return true;
    }
    false
}

fn raise(cache: &mut StorageCache, register: Register, value: f32, now: u32) -> bool {
    let current: f32 = cache.get(register);
    if current == 0.0 || value > current {
        cache.set(register, now, value);
        return true;
    }
    false
}

fn accumulate(cache: &mut StorageCache, register: Register, delta: f32, now: u32) {
    let total: f32 = cache.get(register);
    cache.set(register, now, total + delta);
}

pub struct MeasurementEngine {
    config: MonitorConfig,
    counters: [AlarmCounter; 5],
}

impl MeasurementEngine {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            counters: [AlarmCounter::default(); 5],
        }
    }

    pub fn counter(&self, kind: AlarmKind) -> &AlarmCounter {
        &self.counters[kind.index()]
    }

    /// Window boundary: every counter back to zero.
    pub fn reset_window(&mut self) {
        self.counters.iter_mut().for_each(AlarmCounter::reset);
    }

    /// Converts one set of samples, updates the cache and returns what happened.
    /// `elapsed_ms` is the time since the previous cycle, used for charge
    /// counting.
    pub fn evaluate(
        &mut self,
        cache: &mut StorageCache,
        samples: &Samples,
        now: u32,
        elapsed_ms: u32,
    ) -> CycleReport {
        let limits = Limits::from_cache(cache);
        let config0 = cache.config0();
        let mut status0 = cache.status0() & Status0Flags::TIME_SET;
        status0.set(Status0Flags::CONFIG_SET, !config0.is_empty());
        let mut status1 = Status1Flags::empty();
        let mut conditions = AlarmSet::empty();

        // Temperatures
        let temperatures = samples.thermistors.map(thermistor::temperature);
        for channel in ThermistorChannel::ALL {
            let code = samples.thermistors[channel.index()];
            let celsius = thermistor::celsius(code);
            cache.set_raw(channel.reading(), code as u32);
            cache.set(channel.reading(), now, celsius);

            if !self.config.temperature_range.contains(celsius) {
                status0 |= Status0Flags::RANGE_TEMPERATURE;
                continue;
            }
            if celsius > limits.high_temp {
                conditions |= AlarmSet::OVER_TEMPERATURE;
            }
            if celsius < limits.low_temp {
                conditions |= AlarmSet::UNDER_TEMPERATURE;
            }
            if celsius > limits.high_temp - TEMPERATURE_WARN_MARGIN
                || celsius < limits.low_temp + TEMPERATURE_WARN_MARGIN
            {
                status0 |= Status0Flags::WARN_TEMPERATURE;
            }
            if lower(cache, channel.low(), celsius, now) {
                cache.set(channel.low_time(), now, now);
            }
            if raise(cache, channel.high(), celsius, now) {
                cache.set(channel.high_time(), now, now);
            }
        }

        // Bus supply
        let bus = quotient(samples.bus as f32, limits.bus_divisor);
        cache.set_raw(Register::BusVolts, samples.bus as u32);
        cache.set(Register::BusVolts, now, bus.unwrap_or(0.0));
        match bus {
            Some(volts) => {
                let band = self.config.bus_band;
                if volts < band.min {
                    status1 |= Status1Flags::BUS_LOW | Status1Flags::RANGE_BUS;
                }
                if volts > band.max {
                    status1 |= Status1Flags::BUS_HIGH | Status1Flags::RANGE_BUS;
                }
                lower(cache, Register::BusVoltsLow, volts, now);
                raise(cache, Register::BusVoltsHigh, volts, now);
            }
            None => status1 |= Status1Flags::RANGE_BUS,
        }

        // Load current, positive is discharge
        let current = quotient(samples.current.millivolts, limits.mv_per_amp);
        cache.set_raw(Register::LoadAmps, samples.current.code);
        cache.set(Register::LoadAmps, now, current.unwrap_or(0.0));
        match current {
            Some(amps) => {
                if amps > limits.high_current - CURRENT_WARN_MARGIN {
                    status0 |= Status0Flags::WARN_CURRENT;
                }
                if amps > limits.high_current {
                    conditions |= AlarmSet::OVER_CURRENT;
                }
                if self.config.current_range.contains(amps) {
                    raise(cache, Register::PeakLoadAmps, amps.abs(), now);
                    self.count_charge(cache, amps, now, elapsed_ms);
                } else {
                    status0 |= Status0Flags::RANGE_CURRENT;
                }
            }
            None => status0 |= Status0Flags::RANGE_CURRENT,
        }

        // Pack voltage
        let pack = quotient(samples.pack.millivolts, limits.pack_divisor);
        cache.set_raw(Register::PackVolts, samples.pack.code);
        cache.set(Register::PackVolts, now, pack.unwrap_or(0.0));
        match pack {
            Some(volts) => {
                if volts < limits.low_volt {
                    conditions |= AlarmSet::UNDER_VOLTAGE;
                }
                if volts > limits.high_volt {
                    conditions |= AlarmSet::OVER_VOLTAGE;
                }
                if volts < limits.low_volt + VOLTAGE_WARN_MARGIN
                    || volts > limits.high_volt - VOLTAGE_WARN_MARGIN
                {
                    status0 |= Status0Flags::WARN_VOLTAGE;
                }
                if self.config.pack_range.contains(volts) {
                    lower(cache, Register::PackVoltsLow, volts, now);
                    raise(cache, Register::PackVoltsHigh, volts, now);
                } else {
                    status0 |= Status0Flags::RANGE_VOLTAGE;
                }
            }
            None => status0 |= Status0Flags::RANGE_VOLTAGE,
        }

        for kind in AlarmKind::ALL {
            if conditions.has(kind) {
                self.counters[kind.index()].increment();
            }
        }

        let alarms = if config0.contains(Config0Flags::DISABLE_PROTECTIONS) {
            AlarmSet::empty()
        } else {
            self.fire(cache, config0, now)
        };

        cache.set(Register::Status0, now, status0.bits());
        cache.set(Register::Status1, now, status1.bits());

        let report = CycleReport {
            timestamp: now,
            status0,
            status1,
            alarms,
            readings: Readings {
                temperatures,
                bus_voltage: ElectricPotential::new::<volt>(bus.unwrap_or(0.0)),
                load_current: ElectricCurrent::new::<ampere>(current.unwrap_or(0.0)),
                pack_voltage: ElectricPotential::new::<volt>(pack.unwrap_or(0.0)),
            },
        };
        #[cfg(feature = "defmt")]
        log_report(&report);
        report
    }

    fn fire(&mut self, cache: &mut StorageCache, config0: Config0Flags, now: u32) -> AlarmSet {
        let mut fired = AlarmSet::empty();
        for kind in AlarmKind::ALL {
            if !config0.contains(kind.enable_flag()) {
                continue;
            }
            let threshold = kind.threshold(&self.config.thresholds);
            if self.counters[kind.index()].check(threshold, kind.policy()) {
                fired.insert_kind(kind);
                let trips: u32 = cache.get(kind.trip_register());
                cache.set(kind.trip_register(), now, trips.saturating_add(1));
                cache.set(Register::LastTripTime, now, now);
                cache.set(Register::LastTripReason, now, kind as u8);
            }
        }
        fired
    }

    fn count_charge(&self, cache: &mut StorageCache, amps: f32, now: u32, elapsed_ms: u32) {
        let amp_hours = amps * elapsed_ms as f32 / MS_PER_HOUR;
        if amp_hours >= 0.0 {
            accumulate(cache, Register::TotalAmpsOut, amp_hours, now);
            accumulate(cache, Register::LifetimeAmpsOut, amp_hours, now);
        } else {
            accumulate(cache, Register::TotalAmpsIn, -amp_hours, now);
            accumulate(cache, Register::LifetimeAmpsIn, -amp_hours, now);
        }
        accumulate(cache, Register::CoulombCount, -amp_hours, now);
    }
}

#[cfg(feature = "defmt")]
fn log_report(report: &CycleReport) {
    let now = report.timestamp;
    if report.status0.contains(Status0Flags::RANGE_TEMPERATURE) {
        defmt::error!("{}: temperature sensor out of range", now);
    }
    if report.status0.contains(Status0Flags::WARN_TEMPERATURE) {
        defmt::warn!("{}: temperature near threshold", now);
    }
    if report.status0.contains(Status0Flags::RANGE_CURRENT) {
        defmt::error!(
            "{}: load current sensor out of range ({} A)",
            now,
            report.readings.load_current.get::<ampere>()
        );
    }
    if report.status0.contains(Status0Flags::WARN_CURRENT) {
        defmt::warn!(
            "{}: load current near threshold ({} A)",
            now,
            report.readings.load_current.get::<ampere>()
        );
    }
    if report.status0.contains(Status0Flags::RANGE_VOLTAGE) {
        defmt::error!(
            "{}: pack voltage sensor out of range ({} V)",
            now,
            report.readings.pack_voltage.get::<volt>()
        );
    }
    if report.status0.contains(Status0Flags::WARN_VOLTAGE) {
        defmt::warn!(
            "{}: pack voltage near threshold ({} V)",
            now,
            report.readings.pack_voltage.get::<volt>()
        );
    }
    if !report.status1.is_empty() {
        defmt::warn!(
            "{}: bus voltage out of band ({} V)",
            now,
            report.readings.bus_voltage.get::<volt>()
        );
    }
    for kind in AlarmKind::ALL {
        if report.alarms.has(kind) {
            defmt::error!("{}: ALARM: {}", now, kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_on_fire_counter_restarts() {
        let mut counter = AlarmCounter::default();
        for _ in 0..6 {
            counter.increment();
        }
        assert!(counter.check(5, ResetPolicy::ResetOnFire));
        assert_eq!(counter.count(), 0);
        assert!(!counter.check(5, ResetPolicy::ResetOnFire));
    }

    #[test]
    fn window_counter_fires_once() {
        let mut counter = AlarmCounter::default();
        for _ in 0..21 {
            counter.increment();
        }
        assert!(counter.check(20, ResetPolicy::ResetAtWindow));
        counter.increment();
        assert!(!counter.check(20, ResetPolicy::ResetAtWindow));
        assert_eq!(counter.count(), 22);
        counter.reset();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn counter_at_threshold_does_not_fire() {
        let mut counter = AlarmCounter::default();
        for _ in 0..20 {
            counter.increment();
        }
        assert!(!counter.check(20, ResetPolicy::ResetOnFire));
    }

    #[test]
    fn non_finite_quotients_are_rejected() {
        assert_eq!(quotient(4.0, 2.0), Some(2.0));
        assert_eq!(quotient(4.0, 0.0), None);
        assert_eq!(quotient(0.0, 0.0), None);
    }

    #[test]
    fn alarm_codes() {
        let codes: [u8; 5] = AlarmKind::ALL.map(|k| k as u8);
        assert_eq!(codes, [1, 2, 3, 4, 5]);
        assert_eq!(AlarmKind::OverTemperature.flag(), AlarmSet::OVER_TEMPERATURE);
    }
}

#![cfg(not(feature = "async"))]
#![allow(unused_imports)]
#![allow(dead_code)]

use embedded_hal::i2c::{ErrorType, I2c, Operation};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use pack_monitor_rs::{
    cache::StorageCache,
    registers::{Config0Flags, Register},
    sensors::{AmplifierSample, Samples, SensorFrontEnd, ThermistorChannel},
    thermistor,
    wire::WireValue,
    PackMonitor,
};
use std::cell::RefCell;
use std::rc::Rc;

pub const MONITOR_ADDR: u8 = 0x34;
pub const FRAM_ADDR: u8 = 0x50;

pub const HIGH_CURRENT: f32 = 10.0;
pub const HIGH_TEMP: f32 = 45.0;
pub const LOW_TEMP: f32 = 0.0;
pub const HIGH_VOLT: f32 = 16.8;
pub const LOW_VOLT: f32 = 10.0;
/// Amplifier millivolts per amp
pub const MV_PER_AMP: f32 = 10.0;
/// Amplifier millivolts per pack volt
pub const PACK_DIVISOR: f32 = 100.0;
/// Bus ADC counts per volt
pub const BUS_DIVISOR: f32 = 200.0;
/// 4.9 V
pub const NOMINAL_BUS_CODE: u16 = 980;

pub fn all_protections() -> Config0Flags {
    Config0Flags::OVER_CURRENT
        | Config0Flags::OVER_TEMPERATURE
        | Config0Flags::UNDER_TEMPERATURE
        | Config0Flags::UNDER_VOLTAGE
        | Config0Flags::OVER_VOLTAGE
}

/// Lowest thermistor code at or above `celsius`.
pub fn code_for(celsius: f32) -> u16 {
    thermistor::code_at_or_above((celsius * 100.0) as i32).expect("temperature inside table")
}

pub fn amps(amps: f32) -> AmplifierSample {
    AmplifierSample {
        code: (amps * 1000.0) as i32 as u32,
        millivolts: amps * MV_PER_AMP,
    }
}

pub fn pack_volts(volts: f32) -> AmplifierSample {
    AmplifierSample {
        code: (volts * 1000.0) as u32,
        millivolts: volts * PACK_DIVISOR,
    }
}

/// 25 °C, 4.9 V bus, 2 A discharge, 14 V pack.
pub fn nominal_samples() -> Samples {
    let room = code_for(25.0);
    Samples {
        thermistors: [room; 3],
        bus: NOMINAL_BUS_CODE,
        current: amps(2.0),
        pack: pack_volts(14.0),
    }
}

/// Cache with the test limits and every protection enabled.
pub fn configured_cache() -> StorageCache {
    let mut cache = StorageCache::new();
    cache.set(Register::HighCurrentLimit, 1, HIGH_CURRENT);
    cache.set(Register::HighTempLimit, 1, HIGH_TEMP);
    cache.set(Register::LowTempLimit, 1, LOW_TEMP);
    cache.set(Register::HighVoltLimit, 1, HIGH_VOLT);
    cache.set(Register::LowVoltLimit, 1, LOW_VOLT);
    cache.set(Register::CurrentMvPerAmp, 1, MV_PER_AMP);
    cache.set(Register::PackVoltDivisor, 1, PACK_DIVISOR);
    cache.set(Register::BusVoltDivisor, 1, BUS_DIVISOR);
    cache.set(Register::Config0, 1, all_protections().bits());
    cache
}

/// Writes a value through the bus, as the host would.
pub fn write<T: WireValue>(monitor: &PackMonitor, register: Register, value: T) {
    let slot = value.to_slot();
    let mut frame = vec![register.address()];
    frame.extend_from_slice(&slot[..T::WIRE.width()]);
    monitor.on_receive(&frame);
}

/// Read request followed by a read phase.
pub fn read_bytes(monitor: &PackMonitor, register: Register) -> Vec<u8> {
    monitor.on_receive(&[register.address()]);
    monitor.on_request().as_bytes().to_vec()
}

pub fn read<T: WireValue>(monitor: &PackMonitor, register: Register) -> T {
    let bytes = read_bytes(monitor, register);
    assert_eq!(bytes.len(), T::WIRE.width(), "{:?}", register);
    let mut slot = [0u8; 4];
    slot[..bytes.len()].copy_from_slice(&bytes);
    T::from_slot(slot)
}

/// Sets the limits over the bus.
pub fn configure(monitor: &PackMonitor) {
    write(monitor, Register::HighCurrentLimit, HIGH_CURRENT);
    write(monitor, Register::HighTempLimit, HIGH_TEMP);
    write(monitor, Register::LowTempLimit, LOW_TEMP);
    write(monitor, Register::HighVoltLimit, HIGH_VOLT);
    write(monitor, Register::LowVoltLimit, LOW_VOLT);
    write(monitor, Register::CurrentMvPerAmp, MV_PER_AMP);
    write(monitor, Register::PackVoltDivisor, PACK_DIVISOR);
    write(monitor, Register::BusVoltDivisor, BUS_DIVISOR);
    write(monitor, Register::Config0, all_protections().bits());
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFault;

/// Front end returning whatever samples the test put in it.
#[derive(Debug, Clone)]
pub struct FakeFrontEnd {
    pub samples: Samples,
    pub fail: bool,
    pub reads: usize,
}

impl FakeFrontEnd {
    pub fn new(samples: Samples) -> Self {
        Self {
            samples,
            fail: false,
            reads: 0,
        }
    }

    fn check(&mut self) -> Result<(), SensorFault> {
        self.reads += 1;
        if self.fail {
            return Err(SensorFault);
        }
        Ok(())
    }
}

impl SensorFrontEnd for FakeFrontEnd {
    type Error = SensorFault;

    fn thermistor(&mut self, channel: ThermistorChannel) -> Result<u16, Self::Error> {
        self.check()?;
        Ok(self.samples.thermistors[channel.index()])
    }

    fn bus_voltage(&mut self) -> Result<u16, Self::Error> {
        self.check()?;
        Ok(self.samples.bus)
    }

    fn load_current(&mut self) -> Result<AmplifierSample, Self::Error> {
        self.check()?;
        Ok(self.samples.current)
    }

    fn pack_voltage(&mut self) -> Result<AmplifierSample, Self::Error> {
        self.check()?;
        Ok(self.samples.pack)
    }
}

/// A mock I2C device that can be programmed with expected transactions.
#[derive(Clone)]
pub struct MockI2c {
    mock: Rc<RefCell<I2cMock>>,
}

impl MockI2c {
    pub fn new(transactions: &[I2cTransaction]) -> Self {
        Self {
            mock: Rc::new(RefCell::new(I2cMock::new(transactions))),
        }
    }

    /// Verifies that all expected transactions occurred.
    pub fn done(self) {
        self.mock.borrow_mut().done();
    }
}

impl ErrorType for MockI2c {
    type Error = embedded_hal::i2c::ErrorKind;
}

impl I2c for MockI2c {
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.mock
            .borrow_mut()
            .write(address, bytes)
            .map_err(|_| embedded_hal::i2c::ErrorKind::Other)
    }

    fn read(&mut self, address: u8, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.mock
            .borrow_mut()
            .read(address, bytes)
            .map_err(|_| embedded_hal::i2c::ErrorKind::Other)
    }

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.mock
            .borrow_mut()
            .write_read(address, bytes, buffer)
            .map_err(|_| embedded_hal::i2c::ErrorKind::Other)
    }

    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.mock
            .borrow_mut()
            .transaction(address, operations)
            .map_err(|_| embedded_hal::i2c::ErrorKind::Other)
    }
}

#![no_std]

//! Battery pack monitor exposed to a host as an I2C register device.
//!
//! A [`PackMonitor`] holds the register cache, the epoch clock and the pending
//! bus response behind a critical section. The board's I2C-target interrupt
//! calls [`PackMonitor::on_receive`] and [`PackMonitor::on_request`]; the main
//! loop drives a [`MainCycle`], which samples the analog front end, evaluates
//! limits and alarms, keeps the clock and flushes the cache to non-volatile
//! memory.

#[macro_use]
extern crate uom;

#[cfg(feature = "defmt")]
extern crate defmt;

pub mod cache;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod errors;
pub mod measurement;
pub mod monitor;
pub mod registers;
pub mod sensors;
pub mod storage;
pub mod thermistor;
pub mod units;
pub mod wire;

pub use cache::{StorageCache, StorageRecord};
pub use clock::Clock;
pub use config::{address_from_straps, AlarmThresholds, MonitorConfig, PlausibleRange};
pub use diagnostics::Diagnostic;
pub use dispatcher::TxFrame;
pub use errors::{Error, MonitorError};
pub use measurement::{AlarmKind, AlarmSet, CycleReport, MeasurementEngine, Readings};
pub use monitor::{MainCycle, PackMonitor, PollReport};
pub use registers::{Config0Flags, Register, Status0Flags, Status1Flags};
pub use sensors::{AmplifierSample, Samples, SensorFrontEnd, ThermistorChannel};
pub use storage::{I2cFram, PersistentStore, RamStore};

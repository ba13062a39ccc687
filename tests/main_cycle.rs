#![cfg(not(feature = "async"))]
#![allow(unused_imports)]
#![allow(dead_code)]

#[path = "common.rs"]
mod common;

use common::{
    code_for, configure, nominal_samples, read, write, FakeFrontEnd, SensorFault, MONITOR_ADDR,
};
use pack_monitor_rs::{
    cache::StorageCache,
    diagnostics::Diagnostic,
    measurement::AlarmKind,
    registers::{Register, REGISTER_COUNT},
    storage::RamStore,
    MainCycle, MonitorConfig, MonitorError, PackMonitor,
};

type Store = RamStore<1024>;

fn booted(monitor: &PackMonitor, at_ms: u32) -> MainCycle<'_, Store, FakeFrontEnd> {
    let mut cycle = MainCycle::new(
        monitor,
        Store::new(),
        FakeFrontEnd::new(nominal_samples()),
        MonitorConfig::default(),
    );
    cycle.boot(at_ms).unwrap();
    configure(monitor);
    cycle
}

#[test]
fn test_boot_without_image_reads_zero() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = MainCycle::new(
        &monitor,
        Store::new(),
        FakeFrontEnd::new(nominal_samples()),
        MonitorConfig::default(),
    );
    cycle.boot(0).unwrap();

    assert_eq!(read::<f32>(&monitor, Register::HighTempLimit), 0.0);
    assert_eq!(read::<u32>(&monitor, Register::OverTempTrips), 0);
    assert_eq!(read::<u8>(&monitor, Register::Status0), 0);
}

#[test]
fn test_sampling_follows_period() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);

    assert!(cycle.poll(50).unwrap().cycle.is_none());
    assert_eq!(cycle.sensors_mut().reads, 0);

    let report = cycle.poll(100).unwrap();
    assert!(report.cycle.is_some());
    assert!(cycle.poll(150).unwrap().cycle.is_none());
    assert!(cycle.poll(200).unwrap().cycle.is_some());
    assert_eq!(read::<f32>(&monitor, Register::PackVolts), 14.0);
}

#[test]
fn test_seconds_advance_clock_and_persist_uptime() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);
    write(&monitor, Register::SetEpochTime, 1_700_000_000u32);

    assert_eq!(cycle.poll(1000).unwrap().seconds, 1);
    assert_eq!(monitor.now(), 1_700_000_001);
    assert_eq!(cycle.poll(3500).unwrap().seconds, 2);

    monitor.with(|state| {
        assert_eq!(state.cache.get::<u32>(Register::Uptime), 3);
        assert_eq!(state.cache.get::<u32>(Register::SyncAge), 3);
        assert_eq!(
            state.cache.get::<u32>(Register::FirstInitTime),
            1_700_000_001
        );
    });
    assert_eq!(read::<u32>(&monitor, Register::FirstInitTime), 1_700_000_001);
}

#[test]
fn test_unsynced_clock_does_not_record_uptime() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);

    cycle.poll(2000).unwrap();
    assert_eq!(monitor.now(), 2);
    monitor.with(|state| {
        assert_eq!(state.cache.get::<u32>(Register::Uptime), 0);
        assert_eq!(state.cache.get::<u32>(Register::FirstInitTime), 0);
    });
}

#[test]
fn test_window_flushes_cache() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);

    for now_ms in (100..5000).step_by(100) {
        assert!(!cycle.poll(now_ms).unwrap().flushed);
    }
    assert!(cycle.poll(5000).unwrap().flushed);
    assert_eq!(cycle.store().write_count(), 1);

    let (mut store, _) = cycle.release();
    let persisted = StorageCache::load(&mut store).unwrap();
    assert_eq!(persisted.get::<f32>(Register::HighTempLimit), common::HIGH_TEMP);
    assert_eq!(persisted.get::<f32>(Register::PackVolts), 14.0);
}

#[test]
fn test_over_temperature_through_main_cycle() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);
    cycle.sensors_mut().samples.thermistors[0] = code_for(46.0);

    let mut fired_at = Vec::new();
    for step in 1..=21u32 {
        let report = cycle.poll(step * 100).unwrap();
        let cycle_report = report.cycle.expect("sampled");
        if cycle_report.alarms.has(AlarmKind::OverTemperature) {
            fired_at.push(step);
        }
    }
    assert_eq!(fired_at, vec![21]);
    assert_eq!(read::<u32>(&monitor, Register::OverTempTrips), 1);
    assert_eq!(read::<u8>(&monitor, Register::LastTripReason), 5);
}

#[test]
fn test_window_resets_debounce() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);
    cycle.sensors_mut().samples.thermistors[0] = code_for(46.0);

    // 15 hot cycles before the boundary, 15 after: never 21 in one window.
    for step in 36..=65u32 {
        let report = cycle.poll(step * 100).unwrap();
        assert!(report.cycle.expect("sampled").alarms.is_empty());
        if step == 50 {
            assert!(report.flushed);
            assert_eq!(cycle.engine().counter(AlarmKind::OverTemperature).count(), 0);
        }
    }
    assert_eq!(read::<u32>(&monitor, Register::OverTempTrips), 0);
}

#[test]
fn test_diagnostics_are_drained_by_poll() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);

    monitor.on_receive(&[0x99]);
    write(&monitor, Register::SetEpochTime, 5u32);

    let report = cycle.poll(10).unwrap();
    assert_eq!(
        report.diagnostics.as_slice(),
        &[
            Diagnostic::UnknownCommand { command: 0x99 },
            Diagnostic::InvalidTimestamp { value: 5 },
        ]
    );
    assert!(cycle.poll(20).unwrap().diagnostics.is_empty());
}

#[test]
fn test_diagnostic_overflow_is_counted() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);

    for _ in 0..10 {
        monitor.on_receive(&[0x20]);
    }
    let report = cycle.poll(10).unwrap();
    assert_eq!(report.diagnostics.len(), 8);
    assert_eq!(report.dropped_diagnostics, 2);
}

#[test]
fn test_dump_request() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);

    monitor.on_receive(&[0x77]);
    assert!(cycle.poll(10).unwrap().dumped);
    assert!(!cycle.poll(20).unwrap().dumped);

    let lines = monitor.dump();
    assert_eq!(lines.len(), REGISTER_COUNT);
    let limit = lines
        .iter()
        .find(|line| line.address == Register::HighTempLimit.address())
        .expect("limit line");
    assert_eq!(limit.as_f32, common::HIGH_TEMP);
}

#[test]
fn test_sensor_failure_is_returned() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let mut cycle = booted(&monitor, 0);
    cycle.sensors_mut().fail = true;

    assert!(matches!(
        cycle.poll(100),
        Err(MonitorError::Sensor(SensorFault))
    ));
}

#[test]
fn test_millisecond_counter_wraps() {
    let monitor = PackMonitor::new(MONITOR_ADDR);
    let start = u32::MAX - 49;
    let mut cycle = booted(&monitor, start);

    assert!(cycle.poll(start.wrapping_add(50)).unwrap().cycle.is_none());
    assert!(cycle.poll(start.wrapping_add(100)).unwrap().cycle.is_some());
    assert_eq!(cycle.poll(start.wrapping_add(1000)).unwrap().seconds, 1);
}

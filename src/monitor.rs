//! Interrupt entry points and the cooperative main cycle.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;

use crate::cache::StorageCache;
use crate::config::MonitorConfig;
use crate::diagnostics::{Diagnostic, DIAGNOSTIC_CAPACITY};
use crate::dispatcher::{DeviceState, TxFrame};
use crate::errors::MonitorError;
use crate::measurement::{CycleReport, MeasurementEngine};
use crate::registers::{Register, REGISTER_COUNT};
use crate::sensors::{Samples, SensorFrontEnd};
use crate::storage::PersistentStore;

const MS_PER_SECOND: u32 = 1000;

/// The register device. Lives in a `static` so the bus interrupt and the
/// main cycle can both reach it.
pub struct PackMonitor {
    address: u8,
    banner: TxFrame,
    state: Mutex<RefCell<DeviceState>>,
}

impl PackMonitor {
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            banner: TxFrame::banner(address),
            state: Mutex::new(RefCell::new(DeviceState::new())),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Bus write phase. Call from the target-receive interrupt with the whole
    /// frame, command byte first.
    pub fn on_receive(&self, frame: &[u8]) {
        self.with(|state| state.receive(frame));
    }

    /// Bus read phase. Call from the target-transmit interrupt.
    pub fn on_request(&self) -> TxFrame {
        self.with(|state| state.request(self.banner))
    }

    /// Runs `f` with exclusive access to the shared state.
    pub fn with<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Replaces the cache, typically with the image loaded at boot.
    pub fn install(&self, cache: StorageCache) {
        self.with(|state| state.cache = cache);
    }

    pub fn now(&self) -> u32 {
        self.with(|state| state.clock.now())
    }

    /// One line per record, for the diagnostic dump.
    pub fn dump(&self) -> Vec<DumpLine, REGISTER_COUNT> {
        let cache = self.with(|state| state.cache.clone());
        Register::iter()
            .map(|register| {
                let record = cache.record(register);
                let bits = record.value_bits();
                DumpLine {
                    address: register.address(),
                    timestamp: record.timestamp(),
                    as_f32: f32::from_bits(bits),
                    as_u32: bits,
                    as_i32: bits as i32,
                    raw: record.raw(),
                }
            })
            .collect()
    }
}

/// A record shown under every interpretation of its value slot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DumpLine {
    pub address: u8,
    pub timestamp: u32,
    pub as_f32: f32,
    pub as_u32: u32,
    pub as_i32: i32,
    pub raw: u32,
}

/// What one `poll` did.
#[derive(Debug, Clone, Default)]
pub struct PollReport {
    /// Set when a measurement cycle ran
    pub cycle: Option<CycleReport>,
    /// Interrupt-side diagnostics drained this poll, oldest first
    pub diagnostics: Vec<Diagnostic, DIAGNOSTIC_CAPACITY>,
    /// Diagnostics lost to queue overflow since the last poll
    pub dropped_diagnostics: u16,
    /// Whole seconds added to the clock
    pub seconds: u32,
    pub dumped: bool,
    pub flushed: bool,
}

/// Drives sampling, clock keeping and persistence from a monotonic
/// millisecond counter.
pub struct MainCycle<'a, S, F> {
    monitor: &'a PackMonitor,
    store: S,
    sensors: F,
    engine: MeasurementEngine,
    config: MonitorConfig,
    last_sample_ms: u32,
    last_second_ms: u32,
    last_window_ms: u32,
}

impl<'a, S, F> MainCycle<'a, S, F> {
    pub fn new(monitor: &'a PackMonitor, store: S, sensors: F, config: MonitorConfig) -> Self {
        Self {
            monitor,
            store,
            sensors,
            engine: MeasurementEngine::new(config),
            config,
            last_sample_ms: 0,
            last_second_ms: 0,
            last_window_ms: 0,
        }
    }

    pub fn engine(&self) -> &MeasurementEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sensors_mut(&mut self) -> &mut F {
        &mut self.sensors
    }

    pub fn release(self) -> (S, F) {
        (self.store, self.sensors)
    }

    fn tick_second(&mut self) {
        self.monitor.with(|state| {
            state.clock.advance(1);
            if !state.clock.is_synced() {
                return;
            }
            let now = state.clock.now();
            state.cache.set(Register::Uptime, now, state.clock.uptime());
            state.cache.set(Register::SyncAge, now, state.clock.since_sync());
            if state.cache.get::<u32>(Register::FirstInitTime) == 0 {
                state.cache.set(Register::FirstInitTime, now, now);
            }
        });
    }

    fn drain_diagnostics(&mut self, report: &mut PollReport) {
        self.monitor.with(|state| {
            while let Some(diagnostic) = state.diagnostics.pop() {
                let _ = report.diagnostics.push(diagnostic);
            }
            report.dropped_diagnostics = state.diagnostics.take_dropped();
            report.dumped = state.take_dump_request();
        });

        #[cfg(feature = "defmt")]
        log_diagnostics(report);
    }

    #[cfg(feature = "defmt")]
    fn log_dump(&self) {
        for line in self.monitor.dump() {
            defmt::info!(
                "Addr: {=u8:#x} TS: {} Float: {} UINT: {} SINT: {} RAW: {}",
                line.address,
                line.timestamp,
                line.as_f32,
                line.as_u32,
                line.as_i32,
                line.raw
            );
        }
    }
}

#[cfg(feature = "defmt")]
fn log_diagnostics(report: &PollReport) {
    for diagnostic in report.diagnostics.iter() {
        defmt::warn!("bus: {}", diagnostic);
    }
    if report.dropped_diagnostics > 0 {
        defmt::warn!("bus: {} diagnostics dropped", report.dropped_diagnostics);
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "MainCycle",),
    async(feature = "async", keep_self)
)]
impl<'a, S, F> MainCycle<'a, S, F>
where
    S: PersistentStore,
    F: SensorFrontEnd,
{
    /// Loads the persisted image into the monitor and starts the timers at
    /// `now_ms`.
    pub async fn boot(&mut self, now_ms: u32) -> Result<(), S::Error> {
        let cache = StorageCache::load(&mut self.store).await?;
        self.monitor.install(cache);
        self.last_sample_ms = now_ms;
        self.last_second_ms = now_ms;
        self.last_window_ms = now_ms;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "pack monitor at {=u8:#x}, sampling every {} ms",
            self.monitor.address(),
            self.config.sample_period_ms
        );
        Ok(())
    }

    /// Runs whatever is due at `now_ms`. Call as often as possible; the
    /// counter may wrap.
    pub async fn poll(
        &mut self,
        now_ms: u32,
    ) -> Result<PollReport, MonitorError<S::Error, F::Error>> {
        let mut report = PollReport::default();

        while now_ms.wrapping_sub(self.last_second_ms) >= MS_PER_SECOND {
            self.last_second_ms = self.last_second_ms.wrapping_add(MS_PER_SECOND);
            self.tick_second();
            report.seconds += 1;
        }

        let elapsed_ms = now_ms.wrapping_sub(self.last_sample_ms);
        if elapsed_ms >= self.config.sample_period_ms {
            self.last_sample_ms = now_ms;
            // Sensor I/O stays outside the critical section.
            let samples = Samples::acquire(&mut self.sensors)
                .await
                .map_err(MonitorError::Sensor)?;
            let engine = &mut self.engine;
            report.cycle = Some(self.monitor.with(|state| {
                let now = state.clock.now();
                engine.evaluate(&mut state.cache, &samples, now, elapsed_ms)
            }));
        }

        self.drain_diagnostics(&mut report);
        #[cfg(feature = "defmt")]
        if report.dumped {
            self.log_dump();
        }

        if now_ms.wrapping_sub(self.last_window_ms) >= self.config.window_ms {
            self.last_window_ms = now_ms;
            self.engine.reset_window();
            let snapshot = self.monitor.with(|state| state.cache.clone());
            snapshot
                .flush(&mut self.store)
                .await
                .map_err(MonitorError::Storage)?;
            report.flushed = true;
        }

        Ok(report)
    }
}

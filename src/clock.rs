//! Seconds-resolution epoch clock set by the host.

#[cfg(feature = "defmt")]
use defmt::Format;

/// Earliest epoch accepted from the host (2001-09-09).
pub const MIN_VALID_EPOCH: u32 = 1_000_000_000;

/// Rejected time-set value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct InvalidEpoch(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Clock {
    now: u32,
    first_sync: Option<u32>,
    last_sync: Option<u32>,
}

impl Clock {
    pub const fn new() -> Self {
        Self {
            now: 0,
            first_sync: None,
            last_sync: None,
        }
    }

    pub fn now(&self) -> u32 {
        self.now
    }

    /// Called once per elapsed second by the main cycle.
    pub fn advance(&mut self, seconds: u32) {
        self.now = self.now.saturating_add(seconds);
    }

    /// Accepts a host time. The first accepted value is kept as the first sync.
    pub fn sync(&mut self, epoch: u32) -> Result<(), InvalidEpoch> {
        if epoch <= MIN_VALID_EPOCH {
            return Err(InvalidEpoch(epoch));
        }
        self.now = epoch;
        self.last_sync = Some(epoch);
        self.first_sync.get_or_insert(epoch);
        Ok(())
    }

    pub fn is_synced(&self) -> bool {
        self.first_sync.is_some()
    }

    pub fn first_sync(&self) -> Option<u32> {
        self.first_sync
    }

    pub fn last_sync(&self) -> Option<u32> {
        self.last_sync
    }

    /// Seconds since the first sync, zero before it.
    pub fn uptime(&self) -> u32 {
        self.first_sync.map_or(0, |first| self.now.saturating_sub(first))
    }

    /// Seconds since the most recent sync, zero before the first one.
    pub fn since_sync(&self) -> u32 {
        self.last_sync.map_or(0, |last| self.now.saturating_sub(last))
    }
}

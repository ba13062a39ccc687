//! Bounded queue of events raised on the bus side and logged by the main cycle.

use heapless::Deque;

#[cfg(feature = "defmt")]
use defmt::Format;

pub const DIAGNOSTIC_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum Diagnostic {
    /// Command byte outside the register map.
    UnknownCommand { command: u8 },
    /// Time-set payload at or below the minimum epoch.
    InvalidTimestamp { value: u32 },
    /// Payload width does not match the register type.
    PayloadLength { command: u8, len: u8 },
    /// Payload sent to a read-only register.
    ReadOnlyWrite { command: u8 },
}

/// Drops the oldest entry when full.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticQueue {
    entries: Deque<Diagnostic, DIAGNOSTIC_CAPACITY>,
    dropped: u16,
}

impl DiagnosticQueue {
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            dropped: 0,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.entries.is_full() {
            self.entries.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        let _ = self.entries.push_back(diagnostic);
    }

    pub fn pop(&mut self) -> Option<Diagnostic> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries lost to overflow since the last call.
    pub fn take_dropped(&mut self) -> u16 {
        core::mem::take(&mut self.dropped)
    }
}

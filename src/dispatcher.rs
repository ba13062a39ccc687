//! Write-phase and read-phase handling of bus transactions.
//!
//! Everything here runs in interrupt context: no storage I/O and no
//! formatting. Problems are queued as [`Diagnostic`]s for the main cycle.

use crate::cache::StorageCache;
use crate::clock::Clock;
use crate::diagnostics::{Diagnostic, DiagnosticQueue};
use crate::registers::{Action, LiveClock, Register, RegisterSpec, Status0Flags, DUMP_COMMAND};
use crate::wire::{self, Slot, WireType};

/// Longest response: the banner.
pub const FRAME_CAPACITY: usize = 18;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Bytes handed to the bus peripheral for one read phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxFrame {
    bytes: [u8; FRAME_CAPACITY],
    len: u8,
}

impl TxFrame {
    /// `"Client 0xNN ready!"` with the address in uppercase hex.
    pub const fn banner(address: u8) -> Self {
        let mut bytes = *b"Client 0x00 ready!";
        bytes[9] = HEX[(address >> 4) as usize];
        bytes[10] = HEX[(address & 0x0F) as usize];
        Self {
            bytes,
            len: FRAME_CAPACITY as u8,
        }
    }

    pub fn value(wire: WireType, slot: &Slot) -> Self {
        let data = wire::encode_response(wire, slot);
        let mut bytes = [0u8; FRAME_CAPACITY];
        bytes[..data.len()].copy_from_slice(data);
        Self {
            bytes,
            len: data.len() as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// State shared between the bus handlers and the main cycle.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub cache: StorageCache,
    pub clock: Clock,
    pub diagnostics: DiagnosticQueue,
    pending: Option<TxFrame>,
    dump_requested: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceState {
    pub const fn new() -> Self {
        Self {
            cache: StorageCache::new(),
            clock: Clock::new(),
            diagnostics: DiagnosticQueue::new(),
            pending: None,
            dump_requested: false,
        }
    }

    pub fn pending(&self) -> Option<&TxFrame> {
        self.pending.as_ref()
    }

    /// Returns and clears the dump request.
    pub fn take_dump_request(&mut self) -> bool {
        core::mem::take(&mut self.dump_requested)
    }

    /// Write phase: command byte followed by an optional payload.
    pub fn receive(&mut self, frame: &[u8]) {
        let Some((&command, payload)) = frame.split_first() else {
            return;
        };
        self.pending = None;

        if command == DUMP_COMMAND {
            self.dump_requested = true;
            return;
        }
        let Some(register) = Register::from_address(command) else {
            self.diagnostics.push(Diagnostic::UnknownCommand { command });
            return;
        };

        let spec = register.spec();
        let now = self.clock.now();
        if payload.is_empty() && spec.access.is_readable() {
            self.arm(spec);
            return;
        }

        match spec.action {
            Action::Clear(targets) => {
                for &target in targets {
                    self.cache.clear(target, now);
                }
                self.cache.clear(register, now);
            }
            Action::SetTime => self.set_time(command, payload),
            Action::Store if spec.access.is_writable() => self.store(spec, payload, now),
            Action::Store | Action::Live(_) => {
                self.diagnostics.push(Diagnostic::ReadOnlyWrite { command });
            }
        }
    }

    /// Read phase: the armed response, or the banner when nothing is armed.
    pub fn request(&mut self, banner: TxFrame) -> TxFrame {
        self.pending.take().unwrap_or(banner)
    }

    fn arm(&mut self, spec: &RegisterSpec) {
        let slot = match spec.action {
            Action::Live(live) => self.live(live).to_le_bytes(),
            _ => self.cache.slot(spec.register),
        };
        self.pending = Some(TxFrame::value(spec.wire, &slot));
    }

    fn live(&self, live: LiveClock) -> u32 {
        match live {
            LiveClock::Now => self.clock.now(),
            LiveClock::SyncAge => self.clock.since_sync(),
            LiveClock::Uptime => self.clock.uptime(),
        }
    }

    fn store(&mut self, spec: &RegisterSpec, payload: &[u8], now: u32) {
        match wire::decode_payload(spec.wire, payload) {
            Some(slot) => self.cache.set_slot(spec.register, now, slot),
            None => self.diagnostics.push(Diagnostic::PayloadLength {
                command: spec.register.address(),
                len: payload.len().min(u8::MAX as usize) as u8,
            }),
        }
    }

    fn set_time(&mut self, command: u8, payload: &[u8]) {
        let Some(slot) = wire::decode_payload(WireType::U32, payload) else {
            self.diagnostics.push(Diagnostic::PayloadLength {
                command,
                len: payload.len().min(u8::MAX as usize) as u8,
            });
            return;
        };
        let epoch = u32::from_le_bytes(slot);
        if self.clock.sync(epoch).is_err() {
            self.diagnostics
                .push(Diagnostic::InvalidTimestamp { value: epoch });
            return;
        }
        let status = self.cache.status0() | Status0Flags::TIME_SET;
        self.cache.set(Register::Status0, epoch, status.bits());
        self.cache.set(Register::SetEpochTime, epoch, epoch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_uses_uppercase_hex() {
        assert_eq!(TxFrame::banner(0x34).as_bytes(), b"Client 0x34 ready!");
        assert_eq!(TxFrame::banner(0xAB).as_bytes(), b"Client 0xAB ready!");
    }

    #[test]
    fn value_frames_follow_wire_width() {
        assert_eq!(TxFrame::value(WireType::U8, &[0x80, 0, 0, 0]).as_bytes(), &[0x80]);
        assert_eq!(TxFrame::value(WireType::F32, &[1, 2, 3, 4]).as_bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn empty_frame_keeps_pending_response() {
        let mut state = DeviceState::new();
        state.receive(&[Register::Config0.address()]);
        state.receive(&[]);
        assert!(state.pending().is_some());
    }

    #[test]
    fn write_phase_drops_armed_response() {
        let mut state = DeviceState::new();
        state.receive(&[Register::Config0.address()]);
        state.receive(&[Register::Config1.address(), 3]);
        assert_eq!(state.pending(), None);
    }
}

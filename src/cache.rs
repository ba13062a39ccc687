//! In-memory register records and their persistent image.
//!
//! The record for address `a` lives at `(a - 0x21) * 8` in the image: the
//! 4-byte value slot followed by the little-endian timestamp of the last
//! update. Addresses without a register keep zeroed gaps. A record that reads
//! back as erased memory (all 0xFF) loads as zero.

use crate::registers::{
    Config0Flags, Register, Status0Flags, Status1Flags, FIRST_ADDRESS, LAST_ADDRESS,
    REGISTER_COUNT,
};
use crate::storage::PersistentStore;
use crate::wire::{Slot, WireValue, SLOT_SIZE};

/// Bytes per record in the persistent image.
pub const RECORD_SIZE: usize = 8;
/// Length of the full persistent image.
pub const IMAGE_LEN: usize = (LAST_ADDRESS - FIRST_ADDRESS + 1) as usize * RECORD_SIZE;

const ERASED: [u8; RECORD_SIZE] = [0xFF; RECORD_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageRecord {
    value: Slot,
    timestamp: u32,
    // Last raw converter code behind the value. Not persisted.
    raw: u32,
}

impl StorageRecord {
    pub const ZERO: Self = Self {
        value: [0; SLOT_SIZE],
        timestamp: 0,
        raw: 0,
    };

    pub fn value(&self) -> Slot {
        self.value
    }

    pub fn value_bits(&self) -> u32 {
        u32::from_le_bytes(self.value)
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    fn to_image(self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        bytes[..SLOT_SIZE].copy_from_slice(&self.value);
        bytes[SLOT_SIZE..].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }

    fn from_image(bytes: &[u8]) -> Self {
        if bytes == ERASED {
            return Self::ZERO;
        }
        let mut value = [0u8; SLOT_SIZE];
        let mut timestamp = [0u8; 4];
        value.copy_from_slice(&bytes[..SLOT_SIZE]);
        timestamp.copy_from_slice(&bytes[SLOT_SIZE..RECORD_SIZE]);
        Self {
            value,
            timestamp: u32::from_le_bytes(timestamp),
            raw: 0,
        }
    }
}

fn image_offset(register: Register) -> usize {
    (register.address() - FIRST_ADDRESS) as usize * RECORD_SIZE
}

/// One record per register, indexed in register-map order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCache {
    records: [StorageRecord; REGISTER_COUNT],
}

impl Default for StorageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageCache {
    pub const fn new() -> Self {
        Self {
            records: [StorageRecord::ZERO; REGISTER_COUNT],
        }
    }

    pub fn record(&self, register: Register) -> &StorageRecord {
        &self.records[register.index()]
    }

    pub fn get<T: WireValue>(&self, register: Register) -> T {
        T::from_slot(self.record(register).value)
    }

    /// Typed read by command byte. `None` for addresses outside the map.
    pub fn get_by_address<T: WireValue>(&self, address: u8) -> Option<T> {
        Register::from_address(address).map(|register| self.get(register))
    }

    /// Stores a value. The timestamp only moves forward.
    pub fn set<T: WireValue>(&mut self, register: Register, timestamp: u32, value: T) {
        debug_assert_eq!(register.wire(), T::WIRE, "{:?}", register);
        self.set_slot(register, timestamp, value.to_slot());
    }

    pub fn set_slot(&mut self, register: Register, timestamp: u32, value: Slot) {
        let record = &mut self.records[register.index()];
        record.value = value;
        record.timestamp = record.timestamp.max(timestamp);
    }

    pub fn set_raw(&mut self, register: Register, raw: u32) {
        self.records[register.index()].raw = raw;
    }

    pub fn raw(&self, register: Register) -> u32 {
        self.record(register).raw
    }

    pub fn value_bits(&self, register: Register) -> u32 {
        self.record(register).value_bits()
    }

    pub fn slot(&self, register: Register) -> Slot {
        self.record(register).value
    }

    pub fn timestamp(&self, register: Register) -> u32 {
        self.record(register).timestamp
    }

    /// Zeroes the value and stamps the clear time, even when that is older
    /// than the stored timestamp.
    pub fn clear(&mut self, register: Register, timestamp: u32) {
        let record = &mut self.records[register.index()];
        record.value = [0; SLOT_SIZE];
        record.timestamp = timestamp;
        record.raw = 0;
    }

    pub fn config0(&self) -> Config0Flags {
        Config0Flags::from_bits_retain(self.get(Register::Config0))
    }

    pub fn status0(&self) -> Status0Flags {
        Status0Flags::from_bits_retain(self.get(Register::Status0))
    }

    pub fn status1(&self) -> Status1Flags {
        Status1Flags::from_bits_retain(self.get(Register::Status1))
    }

    pub fn to_image(&self) -> [u8; IMAGE_LEN] {
        let mut image = [0u8; IMAGE_LEN];
        for register in Register::iter() {
            let offset = image_offset(register);
            image[offset..offset + RECORD_SIZE].copy_from_slice(&self.record(register).to_image());
        }
        image
    }

    /// Rebuilds the cache from an image. Status registers are not trusted from
    /// storage: STATUS0 only keeps CONFIG_SET, derived from CONFIG0, and
    /// STATUS1 starts clear.
    pub fn from_image(image: &[u8; IMAGE_LEN]) -> Self {
        let mut cache = Self::new();
        for register in Register::iter() {
            let offset = image_offset(register);
            cache.records[register.index()] =
                StorageRecord::from_image(&image[offset..offset + RECORD_SIZE]);
        }

        let status = if cache.config0().is_empty() {
            Status0Flags::empty()
        } else {
            Status0Flags::CONFIG_SET
        };
        cache.records[Register::Status0.index()].value = status.bits().to_slot();
        cache.records[Register::Status1.index()].value = [0; SLOT_SIZE];
        cache
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "StorageCache",),
    async(feature = "async", keep_self)
)]
impl StorageCache {
    /// Reads the whole image from the store.
    pub async fn load<S: PersistentStore>(store: &mut S) -> Result<Self, S::Error> {
        let mut image = [0u8; IMAGE_LEN];
        store.read(0, &mut image).await?;
        Ok(Self::from_image(&image))
    }

    /// Writes every record back in one pass.
    pub async fn flush<S: PersistentStore>(&self, store: &mut S) -> Result<(), S::Error> {
        store.write(0, &self.to_image()).await
    }
}

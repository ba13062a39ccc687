//! Little-endian encoding shared by the bus and the persistent image.
//!
//! Every register occupies a 4-byte slot. Narrow types use the low bytes and
//! leave the rest zero. `F32` is the 4-byte IEEE-754 single; hosts that think
//! of these registers as "double" still get 4 bytes on the wire.

#[cfg(feature = "defmt")]
use defmt::Format;

/// Size of a value slot in the cache and in the persistent image.
pub const SLOT_SIZE: usize = 4;

pub type Slot = [u8; SLOT_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum WireType {
    /// Command without a value
    Empty,
    U8,
    U32,
    I32,
    F32,
}

impl WireType {
    /// Bytes on the bus for this type.
    pub const fn width(self) -> usize {
        match self {
            WireType::Empty => 0,
            WireType::U8 => 1,
            WireType::U32 | WireType::I32 | WireType::F32 => 4,
        }
    }
}

/// A Rust type with a fixed wire encoding.
pub trait WireValue: Copy {
    const WIRE: WireType;

    fn to_slot(self) -> Slot;

    fn from_slot(slot: Slot) -> Self;
}

impl WireValue for u8 {
    const WIRE: WireType = WireType::U8;

    fn to_slot(self) -> Slot {
        [self, 0, 0, 0]
    }

    fn from_slot(slot: Slot) -> Self {
        slot[0]
    }
}

impl WireValue for u32 {
    const WIRE: WireType = WireType::U32;

    fn to_slot(self) -> Slot {
        self.to_le_bytes()
    }

    fn from_slot(slot: Slot) -> Self {
        u32::from_le_bytes(slot)
    }
}

impl WireValue for i32 {
    const WIRE: WireType = WireType::I32;

    fn to_slot(self) -> Slot {
        self.to_le_bytes()
    }

    fn from_slot(slot: Slot) -> Self {
        i32::from_le_bytes(slot)
    }
}

impl WireValue for f32 {
    const WIRE: WireType = WireType::F32;

    fn to_slot(self) -> Slot {
        self.to_le_bytes()
    }

    fn from_slot(slot: Slot) -> Self {
        f32::from_le_bytes(slot)
    }
}

/// Turns a write payload into a slot. The payload must be exactly as wide as
/// the wire type.
pub fn decode_payload(wire: WireType, payload: &[u8]) -> Option<Slot> {
    if wire == WireType::Empty || payload.len() != wire.width() {
        return None;
    }
    let mut slot = [0u8; SLOT_SIZE];
    slot[..payload.len()].copy_from_slice(payload);
    Some(slot)
}

/// The bytes a read of this type puts on the bus.
pub fn encode_response(wire: WireType, slot: &Slot) -> &[u8] {
    &slot[..wire.width()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_is_four_bytes_little_endian() {
        // 45.0 == 0x4234_0000
        assert_eq!(45.0f32.to_slot(), [0x00, 0x00, 0x34, 0x42]);
        assert_eq!(f32::from_slot([0x00, 0x00, 0x34, 0x42]), 45.0);
    }

    #[test]
    fn signed_values_keep_their_sign() {
        assert_eq!(i32::from_slot((-5i32).to_slot()), -5);
        assert_eq!((-1i32).to_slot(), [0xFF; 4]);
    }

    #[test]
    fn byte_values_use_the_low_byte() {
        assert_eq!(0xA5u8.to_slot(), [0xA5, 0, 0, 0]);
        assert_eq!(encode_response(WireType::U8, &0xA5u8.to_slot()), &[0xA5]);
    }

    #[test]
    fn payload_width_must_match() {
        assert_eq!(decode_payload(WireType::U8, &[7]), Some([7, 0, 0, 0]));
        assert_eq!(decode_payload(WireType::U8, &[7, 0, 0, 0]), None);
        assert_eq!(decode_payload(WireType::F32, &[1, 2]), None);
        assert_eq!(decode_payload(WireType::U32, &[1, 2, 3, 4, 5]), None);
        assert_eq!(decode_payload(WireType::Empty, &[]), None);
        assert_eq!(
            decode_payload(WireType::U32, &[0x01, 0x02, 0x03, 0x04]),
            Some([0x01, 0x02, 0x03, 0x04])
        );
    }
}

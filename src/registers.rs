use bitflags::bitflags;

#[cfg(feature = "defmt")]
use defmt::Format;

use crate::wire::WireType;

/// Lowest address of the register window.
pub const FIRST_ADDRESS: u8 = 0x21;
/// Highest address of the register window.
pub const LAST_ADDRESS: u8 = 0x64;
/// Command byte asking the main cycle to print every record. Not a register.
pub const DUMP_COMMAND: u8 = 0x77;
/// Number of defined registers.
pub const REGISTER_COUNT: usize = 58;

const WINDOW: usize = (LAST_ADDRESS - FIRST_ADDRESS + 1) as usize;
const NO_SLOT: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
#[repr(u8)]
pub enum Register {
    /// High load current limit (A)
    HighCurrentLimit = 0x21,
    /// High temperature limit (°C)
    HighTempLimit = 0x22,
    /// Low temperature limit (°C)
    LowTempLimit = 0x23,
    /// High pack voltage limit (V)
    HighVoltLimit = 0x24,
    /// Low pack voltage limit (V)
    LowVoltLimit = 0x25,
    /// Protection enables, see [`Config0Flags`]
    Config0 = 0x26,
    Config1 = 0x27,
    Config2 = 0x28,
    /// Current amplifier scale (mV per A)
    CurrentMvPerAmp = 0x29,
    /// Pack voltage divisor (amplifier mV per pack V)
    PackVoltDivisor = 0x2A,
    /// Bus voltage divisor (ADC counts per V)
    BusVoltDivisor = 0x2B,
    /// See [`Status0Flags`]
    Status0 = 0x2C,
    /// See [`Status1Flags`]
    Status1 = 0x2D,
    /// Thermistor scaling factor, stored for the host
    ThermistorScale = 0x2E,
    ClearCoulombCounter = 0x30,
    /// Net charge into the pack since the last clear (Ah)
    CoulombCount = 0x31,
    /// Peak absolute load current (A). A write clears the amp-hour totals.
    PeakLoadAmps = 0x32,
    LoadAmps = 0x33,
    TotalAmpsIn = 0x34,
    TotalAmpsOut = 0x35,
    LifetimeAmpsIn = 0x36,
    LifetimeAmpsOut = 0x37,
    ClearVoltMemory = 0x38,
    PackVolts = 0x39,
    PackVoltsLow = 0x3A,
    PackVoltsHigh = 0x3B,
    BusVolts = 0x3C,
    BusVoltsLow = 0x3D,
    BusVoltsHigh = 0x3E,
    ClearTempMemory = 0x40,
    Temp0 = 0x41,
    Temp1 = 0x42,
    Temp2 = 0x43,
    Temp0Low = 0x44,
    Temp1Low = 0x45,
    Temp2Low = 0x46,
    Temp0High = 0x47,
    Temp1High = 0x48,
    Temp2High = 0x49,
    Temp0LowTime = 0x4A,
    Temp1LowTime = 0x4B,
    Temp2LowTime = 0x4C,
    Temp0HighTime = 0x4D,
    Temp1HighTime = 0x4E,
    Temp2HighTime = 0x4F,
    ClearTripHistory = 0x50,
    OverCurrentTrips = 0x51,
    UnderVoltageTrips = 0x52,
    OverVoltageTrips = 0x53,
    UnderTempTrips = 0x54,
    OverTempTrips = 0x55,
    LastTripTime = 0x56,
    /// [`crate::measurement::AlarmKind`] code of the last trip
    LastTripReason = 0x57,
    SetEpochTime = 0x60,
    FirstInitTime = 0x61,
    CurrentTime = 0x62,
    /// Seconds since the last time sync
    SyncAge = 0x63,
    /// Seconds since the first time sync
    Uptime = 0x64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    /// Readable; any payload clears the register and its companions.
    ClearOnWrite,
}

impl Access {
    pub fn is_readable(self) -> bool {
        !matches!(self, Access::WriteOnly)
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

/// Values derived from the clock at the moment a read is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum LiveClock {
    Now,
    SyncAge,
    Uptime,
}

/// What the write phase does with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Plain value held in the cache.
    Store,
    /// Resets the command's own record and the listed registers to zero.
    Clear(&'static [Register]),
    /// Sets the epoch clock.
    SetTime,
    /// Read answered from the clock instead of the cache.
    Live(LiveClock),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    pub register: Register,
    pub wire: WireType,
    pub access: Access,
    pub action: Action,
}

const fn entry(register: Register, wire: WireType, access: Access, action: Action) -> RegisterSpec {
    RegisterSpec {
        register,
        wire,
        access,
        action,
    }
}

const fn limit(register: Register) -> RegisterSpec {
    entry(register, WireType::F32, Access::ReadWrite, Action::Store)
}

const fn reading(register: Register) -> RegisterSpec {
    entry(register, WireType::F32, Access::ReadOnly, Action::Store)
}

const fn counter(register: Register) -> RegisterSpec {
    entry(register, WireType::U32, Access::ReadOnly, Action::Store)
}

const fn clear(register: Register, targets: &'static [Register]) -> RegisterSpec {
    entry(register, WireType::Empty, Access::WriteOnly, Action::Clear(targets))
}

const COULOMB_MEMORY: &[Register] = &[Register::CoulombCount];

const AMP_TOTALS: &[Register] = &[Register::TotalAmpsIn, Register::TotalAmpsOut];

const VOLT_MEMORY: &[Register] = &[
    Register::PackVoltsLow,
    Register::PackVoltsHigh,
    Register::BusVoltsLow,
    Register::BusVoltsHigh,
];

const TEMP_MEMORY: &[Register] = &[
    Register::Temp0Low,
    Register::Temp1Low,
    Register::Temp2Low,
    Register::Temp0High,
    Register::Temp1High,
    Register::Temp2High,
    Register::Temp0LowTime,
    Register::Temp1LowTime,
    Register::Temp2LowTime,
    Register::Temp0HighTime,
    Register::Temp1HighTime,
    Register::Temp2HighTime,
];

const TRIP_HISTORY: &[Register] = &[
    Register::OverCurrentTrips,
    Register::UnderVoltageTrips,
    Register::OverVoltageTrips,
    Register::UnderTempTrips,
    Register::OverTempTrips,
    Register::LastTripTime,
    Register::LastTripReason,
];

const TABLE: [RegisterSpec; REGISTER_COUNT] = [
    limit(Register::HighCurrentLimit),
    limit(Register::HighTempLimit),
    limit(Register::LowTempLimit),
    limit(Register::HighVoltLimit),
    limit(Register::LowVoltLimit),
    entry(Register::Config0, WireType::U8, Access::ReadWrite, Action::Store),
    entry(Register::Config1, WireType::U8, Access::ReadWrite, Action::Store),
    entry(Register::Config2, WireType::U8, Access::ReadWrite, Action::Store),
    limit(Register::CurrentMvPerAmp),
    limit(Register::PackVoltDivisor),
    limit(Register::BusVoltDivisor),
    entry(Register::Status0, WireType::U8, Access::ReadOnly, Action::Store),
    entry(Register::Status1, WireType::U8, Access::ReadOnly, Action::Store),
    limit(Register::ThermistorScale),
    clear(Register::ClearCoulombCounter, COULOMB_MEMORY),
    reading(Register::CoulombCount),
    entry(
        Register::PeakLoadAmps,
        WireType::F32,
        Access::ClearOnWrite,
        Action::Clear(AMP_TOTALS),
    ),
    reading(Register::LoadAmps),
    reading(Register::TotalAmpsIn),
    reading(Register::TotalAmpsOut),
    reading(Register::LifetimeAmpsIn),
    reading(Register::LifetimeAmpsOut),
    clear(Register::ClearVoltMemory, VOLT_MEMORY),
    reading(Register::PackVolts),
    reading(Register::PackVoltsLow),
    reading(Register::PackVoltsHigh),
    reading(Register::BusVolts),
    reading(Register::BusVoltsLow),
    reading(Register::BusVoltsHigh),
    clear(Register::ClearTempMemory, TEMP_MEMORY),
    reading(Register::Temp0),
    reading(Register::Temp1),
    reading(Register::Temp2),
    reading(Register::Temp0Low),
    reading(Register::Temp1Low),
    reading(Register::Temp2Low),
    reading(Register::Temp0High),
    reading(Register::Temp1High),
    reading(Register::Temp2High),
    counter(Register::Temp0LowTime),
    counter(Register::Temp1LowTime),
    counter(Register::Temp2LowTime),
    counter(Register::Temp0HighTime),
    counter(Register::Temp1HighTime),
    counter(Register::Temp2HighTime),
    clear(Register::ClearTripHistory, TRIP_HISTORY),
    counter(Register::OverCurrentTrips),
    counter(Register::UnderVoltageTrips),
    counter(Register::OverVoltageTrips),
    counter(Register::UnderTempTrips),
    counter(Register::OverTempTrips),
    counter(Register::LastTripTime),
    entry(Register::LastTripReason, WireType::U8, Access::ReadOnly, Action::Store),
    entry(Register::SetEpochTime, WireType::U32, Access::WriteOnly, Action::SetTime),
    counter(Register::FirstInitTime),
    entry(
        Register::CurrentTime,
        WireType::U32,
        Access::ReadOnly,
        Action::Live(LiveClock::Now),
    ),
    entry(
        Register::SyncAge,
        WireType::U32,
        Access::ReadOnly,
        Action::Live(LiveClock::SyncAge),
    ),
    entry(
        Register::Uptime,
        WireType::U32,
        Access::ReadOnly,
        Action::Live(LiveClock::Uptime),
    ),
];

/// The command table, sorted by address.
pub static REGISTER_MAP: [RegisterSpec; REGISTER_COUNT] = TABLE;

// Address -> position in REGISTER_MAP.
const SLOTS: [u8; WINDOW] = {
    let mut slots = [NO_SLOT; WINDOW];
    let mut i = 0;
    while i < REGISTER_COUNT {
        slots[(TABLE[i].register as u8 - FIRST_ADDRESS) as usize] = i as u8;
        i += 1;
    }
    slots
};

impl Register {
    /// Looks up a command byte. Returns `None` for anything outside the map.
    pub fn from_address(address: u8) -> Option<Self> {
        if !(FIRST_ADDRESS..=LAST_ADDRESS).contains(&address) {
            return None;
        }
        match SLOTS[(address - FIRST_ADDRESS) as usize] {
            NO_SLOT => None,
            slot => Some(REGISTER_MAP[slot as usize].register),
        }
    }

    pub fn address(self) -> u8 {
        self as u8
    }

    /// Position of this register in [`REGISTER_MAP`] and in the cache.
    pub fn index(self) -> usize {
        SLOTS[(self as u8 - FIRST_ADDRESS) as usize] as usize
    }

    pub fn spec(self) -> &'static RegisterSpec {
        &REGISTER_MAP[self.index()]
    }

    pub fn wire(self) -> WireType {
        self.spec().wire
    }

    pub fn iter() -> impl Iterator<Item = Register> {
        REGISTER_MAP.iter().map(|spec| spec.register)
    }
}

bitflags! {
    /// CONFIG0: protection category enables.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Config0Flags: u8 {
        /// Monitor only, never raise alarms
        const DISABLE_PROTECTIONS = 1 << 7;
        const OVER_CURRENT = 1 << 6;
        const OVER_TEMPERATURE = 1 << 5;
        const UNDER_TEMPERATURE = 1 << 4;
        const UNDER_VOLTAGE = 1 << 3;
        const OVER_VOLTAGE = 1 << 2;
        const STATUS_LEDS = 1 << 0;
    }
}

bitflags! {
    /// STATUS0: configuration, clock, warnings and sensor range errors.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status0Flags: u8 {
        /// CONFIG0 holds a non-zero configuration
        const CONFIG_SET = 1 << 7;
        /// Host has set the clock since boot
        const TIME_SET = 1 << 6;
        const WARN_TEMPERATURE = 1 << 5;
        const WARN_CURRENT = 1 << 4;
        const WARN_VOLTAGE = 1 << 3;
        const RANGE_TEMPERATURE = 1 << 2;
        const RANGE_CURRENT = 1 << 1;
        const RANGE_VOLTAGE = 1 << 0;
    }
}

impl Status0Flags {
    /// Bits that survive the per-cycle recompute.
    pub const STICKY: Self = Self::CONFIG_SET.union(Self::TIME_SET);
}

bitflags! {
    /// STATUS1: bus supply state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status1Flags: u8 {
        /// Bus voltage outside the acceptable band
        const RANGE_BUS = 1 << 0;
        const BUS_LOW = 1 << 1;
        const BUS_HIGH = 1 << 2;
    }
}

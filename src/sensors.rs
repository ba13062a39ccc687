//! Analog front end: thermistor and bus channels on the MCU converter, load
//! current and pack voltage on an external bridge amplifier.

#[cfg(feature = "defmt")]
use defmt::Format;

use crate::registers::Register;

/// Averaged reading from a channel of the external amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct AmplifierSample {
    /// Raw converter code
    pub code: u32,
    /// Code scaled to millivolts at the amplifier input
    pub millivolts: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum ThermistorChannel {
    T0,
    T1,
    T2,
}

impl ThermistorChannel {
    pub const ALL: [ThermistorChannel; 3] = [Self::T0, Self::T1, Self::T2];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn reading(self) -> Register {
        [Register::Temp0, Register::Temp1, Register::Temp2][self.index()]
    }

    pub fn low(self) -> Register {
        [Register::Temp0Low, Register::Temp1Low, Register::Temp2Low][self.index()]
    }

    pub fn high(self) -> Register {
        [Register::Temp0High, Register::Temp1High, Register::Temp2High][self.index()]
    }

    pub fn low_time(self) -> Register {
        [
            Register::Temp0LowTime,
            Register::Temp1LowTime,
            Register::Temp2LowTime,
        ][self.index()]
    }

    pub fn high_time(self) -> Register {
        [
            Register::Temp0HighTime,
            Register::Temp1HighTime,
            Register::Temp2HighTime,
        ][self.index()]
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "SensorFrontEnd",),
    async(feature = "async", keep_self)
)]
#[allow(async_fn_in_trait)]
/// Source of averaged converter readings. Implementations do their own
/// averaging; the monitor takes one value per channel per cycle.
pub trait SensorFrontEnd {
    type Error;

    /// 10-bit thermistor divider code.
    async fn thermistor(&mut self, channel: ThermistorChannel) -> Result<u16, Self::Error>;

    /// 10-bit bus voltage code.
    async fn bus_voltage(&mut self) -> Result<u16, Self::Error>;

    async fn load_current(&mut self) -> Result<AmplifierSample, Self::Error>;

    async fn pack_voltage(&mut self) -> Result<AmplifierSample, Self::Error>;
}

/// Everything one measurement cycle needs, gathered before the cache is locked.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub struct Samples {
    pub thermistors: [u16; 3],
    pub bus: u16,
    pub current: AmplifierSample,
    pub pack: AmplifierSample,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "Samples",),
    async(feature = "async", keep_self)
)]
impl Samples {
    pub async fn acquire<F: SensorFrontEnd>(front_end: &mut F) -> Result<Self, F::Error> {
        let mut thermistors = [0u16; 3];
        for channel in ThermistorChannel::ALL {
            thermistors[channel.index()] = front_end.thermistor(channel).await?;
        }
        Ok(Self {
            thermistors,
            bus: front_end.bus_voltage().await?,
            current: front_end.load_current().await?,
            pack: front_end.pack_voltage().await?,
        })
    }
}

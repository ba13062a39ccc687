#[cfg(feature = "defmt")]
use defmt::Format;

/// Errors raised by the persistent memory layer.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum Error<E: PartialEq> {
    /// An error occurred during I2C communication with the memory device.
    I2c(E),
    /// The access runs past the end of the device.
    OutOfRange { offset: u16, len: usize },
    /// A transfer did not fit the staging buffer.
    Buffer,
}

/// Failure of a main-cycle step.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(Format))]
pub enum MonitorError<S, F> {
    /// Loading or flushing the register image failed.
    Storage(S),
    /// The analog front end could not be sampled.
    Sensor(F),
}

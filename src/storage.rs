//! Non-volatile memory holding the register image.

use core::convert::Infallible;

#[cfg(not(feature = "async"))]
use embedded_hal::i2c::I2c;
#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c;

use crate::errors::Error;

/// Default 7-bit address of the I2C FRAM.
pub const DEFAULT_FRAM_ADDRESS: u8 = 0x50;
/// 64 Kbit part.
pub const DEFAULT_FRAM_CAPACITY: usize = 8192;
/// Largest data block sent in one bus transaction.
pub const PAGE_SIZE: usize = 32;

const FRAME_SIZE: usize = PAGE_SIZE + 2;

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "PersistentStore",),
    async(feature = "async", keep_self)
)]
#[allow(async_fn_in_trait)]
/// Byte-addressed memory that survives power loss.
pub trait PersistentStore {
    type Error;

    async fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error>;

    async fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error>;
}

/// I2C FRAM addressed with two big-endian memory address bytes.
pub struct I2cFram<I2C> {
    address: u8,
    capacity: usize,
    i2c: I2C,
}

impl<I2C> I2cFram<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self::with_capacity(i2c, address, DEFAULT_FRAM_CAPACITY)
    }

    pub fn with_capacity(i2c: I2C, address: u8, capacity: usize) -> Self {
        Self {
            address,
            capacity,
            i2c,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Gives the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn check_bounds<E: PartialEq>(&self, offset: u16, len: usize) -> Result<(), Error<E>> {
        if offset as usize + len > self.capacity {
            return Err(Error::OutOfRange { offset, len });
        }
        Ok(())
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "I2cFram",),
    async(feature = "async", keep_self)
)]
impl<I2C, E> PersistentStore for I2cFram<I2C>
where
    I2C: I2c<Error = E>,
    E: PartialEq,
{
    type Error = Error<E>;

    async fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.check_bounds::<E>(offset, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        self.i2c
            .write_read(self.address, &offset.to_be_bytes(), buf)
            .await
            .map_err(Error::I2c)
    }

    async fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error> {
        self.check_bounds::<E>(offset, data.len())?;
        let mut cursor = offset as usize;
        let mut remaining = data;
        while !remaining.is_empty() {
            // Never let a block cross a page boundary.
            let room = PAGE_SIZE - cursor % PAGE_SIZE;
            let (chunk, rest) = remaining.split_at(room.min(remaining.len()));

            let mut frame: heapless::Vec<u8, FRAME_SIZE> = heapless::Vec::new();
            frame
                .extend_from_slice(&(cursor as u16).to_be_bytes())
                .map_err(|_| Error::Buffer)?;
            frame.extend_from_slice(chunk).map_err(|_| Error::Buffer)?;
            self.i2c
                .write(self.address, &frame)
                .await
                .map_err(Error::I2c)?;

            cursor += chunk.len();
            remaining = rest;
        }
        Ok(())
    }
}

/// Memory-backed store. Starts erased (all 0xFF).
#[derive(Debug, Clone)]
pub struct RamStore<const N: usize> {
    bytes: [u8; N],
    writes: usize,
}

impl<const N: usize> RamStore<N> {
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; N],
            writes: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Number of `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn span(offset: u16, len: usize) -> Result<core::ops::Range<usize>, Error<Infallible>> {
        let start = offset as usize;
        if start + len > N {
            return Err(Error::OutOfRange { offset, len });
        }
        Ok(start..start + len)
    }
}

impl<const N: usize> Default for RamStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), self = "RamStore",),
    async(feature = "async", keep_self)
)]
impl<const N: usize> PersistentStore for RamStore<N> {
    type Error = Error<Infallible>;

    async fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        let span = Self::span(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[span]);
        Ok(())
    }

    async fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error> {
        let span = Self::span(offset, data.len())?;
        self.bytes[span].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}

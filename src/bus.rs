//! Register-addressed bus access.
//!
//! The driver never talks to an I²C peripheral directly. It goes through
//! [`RegisterBus`], which any transport can implement. [`I2cBus`] provides the
//! implementation for every `embedded_hal::i2c::I2c`.

use embedded_hal::i2c::I2c;

/// Default 7-bit I²C address of the BMP180.
pub const DEFAULT_ADDRESS: u8 = 0x77;

/// Longest payload sent in a single I²C write by [`I2cBus::write_block`].
///
/// The payload is copied behind the register address into a stack frame of
/// this size. The driver itself never writes more than one byte.
const MAX_WRITE_LEN: usize = 8;

/// Block access to the registers of a single device.
///
/// The device keeps an internal register pointer that advances with every
/// byte transferred. `read` and `write` continue from wherever the previous
/// access stopped.
pub trait RegisterBus {
    /// Transport error type.
    type Error: core::fmt::Debug;

    /// Fills `buf` with consecutive registers starting at `register`.
    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` to consecutive registers starting at `register`.
    fn write_block(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Fills `buf` starting at the current register pointer.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Writes `data` starting at the current register pointer.
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Releases the underlying device.
    fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    type Error = T::Error;

    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read_block(self, register, buf)
    }

    fn write_block(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        T::write_block(self, register, data)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::read(self, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, data)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        T::close(self)
    }
}

/// [`RegisterBus`] over an `embedded-hal` I²C bus.
pub struct I2cBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> I2cBus<I2C>
where
    I2C: I2c,
{
    /// Uses the default device address (0x77).
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Gives back the I²C peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> RegisterBus for I2cBus<I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;

    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[register], buf)
    }

    fn write_block(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        if data.is_empty() {
            // Only moves the register pointer.
            return self.i2c.write(self.address, &[register]);
        }

        // The register address travels in the same frame as the payload.
        let mut frame = [0u8; MAX_WRITE_LEN + 1];
        for (i, chunk) in data.chunks(MAX_WRITE_LEN).enumerate() {
            frame[0] = register.wrapping_add((i * MAX_WRITE_LEN) as u8);
            frame[1..=chunk.len()].copy_from_slice(chunk);
            self.i2c.write(self.address, &frame[..=chunk.len()])?;
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(self.address, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(self.address, data)
    }
}

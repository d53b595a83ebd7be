// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The register access and sleep primitives the driver is built on.
use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::blocking::i2c;
use log::trace;

/// The default 7-bit I²C address of the MLX90632.
pub const DEFAULT_ADDRESS: u8 = 0x3A;

/// Word-level access to the sensor, along with a way to wait.
///
/// Every register and memory location on the MLX90632 is a 16-bit word with a 16-bit address.
/// The driver does nothing but call these methods, so anything implementing this trait can be used
/// to talk to a sensor (or to pretend to be one).
pub trait Transport {
    type Error;

    /// Read the word at `register`.
    fn read(&mut self, register: u16) -> Result<u16, Self::Error>;

    /// Write `value` to `register`.
    fn write(&mut self, register: u16, value: u16) -> Result<(), Self::Error>;

    /// Sleep for somewhere between `min_us` and `max_us` microseconds.
    fn sleep_range(&mut self, min_us: u32, max_us: u32);

    /// Sleep for at least `duration_ms` milliseconds.
    fn sleep_ms(&mut self, duration_ms: u32);
}

impl<T> Transport for &mut T
where
    T: Transport + ?Sized,
{
    type Error = T::Error;

    fn read(&mut self, register: u16) -> Result<u16, Self::Error> {
        (**self).read(register)
    }

    fn write(&mut self, register: u16, value: u16) -> Result<(), Self::Error> {
        (**self).write(register, value)
    }

    fn sleep_range(&mut self, min_us: u32, max_us: u32) {
        (**self).sleep_range(min_us, max_us)
    }

    fn sleep_ms(&mut self, duration_ms: u32) {
        (**self).sleep_ms(duration_ms)
    }
}

/// A [`Transport`] using an `embedded-hal` I²C bus and delay provider.
///
/// Addresses and data are sent big-endian. A read is a combined write-read transaction of the
/// two address bytes followed by reading two data bytes, a write is a single four byte write.
#[derive(Clone, Debug)]
pub struct I2cTransport<I2C, D> {
    bus: I2C,
    address: u8,
    delay: D,
}

impl<I2C, D> I2cTransport<I2C, D> {
    pub fn new(bus: I2C, address: u8, delay: D) -> Self {
        Self {
            bus,
            address,
            delay,
        }
    }

    /// The I²C address of the sensor.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Consume the transport, returning the bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.bus, self.delay)
    }
}

impl<I2C, D, E> Transport for I2cTransport<I2C, D>
where
    I2C: i2c::WriteRead<Error = E> + i2c::Write<Error = E>,
    D: DelayUs<u32> + DelayMs<u32>,
{
    type Error = E;

    fn read(&mut self, register: u16) -> Result<u16, Self::Error> {
        let mut data = [0u8; 2];
        self.bus
            .write_read(self.address, &register.to_be_bytes(), &mut data)?;
        let value = u16::from_be_bytes(data);
        trace!("read {:#06x} from {:#06x}", value, register);
        Ok(value)
    }

    fn write(&mut self, register: u16, value: u16) -> Result<(), Self::Error> {
        let register_bytes = register.to_be_bytes();
        let value_bytes = value.to_be_bytes();
        let combined: [u8; 4] = [
            register_bytes[0],
            register_bytes[1],
            value_bytes[0],
            value_bytes[1],
        ];
        trace!("writing {:#06x} to {:#06x}", value, register);
        self.bus.write(self.address, &combined)
    }

    fn sleep_range(&mut self, min_us: u32, _max_us: u32) {
        // Blocking delays have no notion of slack, so the lower bound is used.
        self.delay.delay_us(min_us);
    }

    fn sleep_ms(&mut self, duration_ms: u32) {
        self.delay.delay_ms(duration_ms);
    }
}

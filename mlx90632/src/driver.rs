// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use log::{debug, warn};

use crate::address::{EepromAddress, RegisterAddress};
use crate::calculations::{self, Emissivity};
use crate::eeprom::CalibrationConstants;
use crate::error::Error;
use crate::measurement::{ExtendedRawSample, RawSample};
use crate::register::{Register, StatusRegister};
use crate::transport::{I2cTransport, Transport};

/// The DSP version this driver implements the compensation formulas for.
pub const DSP_VERSION_5: u16 = 0x05;

const DSP_VERSION_MASK: u16 = 0x00FF;

/// The bits of the version word that mark a sensor as supporting the extended range.
const RANGE_KEY_MASK: u16 = 0x7F00;

const EXTENDED_RANGE_KEY: u16 = 0x0500;

/// The measurement ranges a sensor supports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RangeSupport {
    /// Only the medical range.
    Medical,

    /// Both the medical and extended ranges.
    Extended,
}

/// A driver for an MLX90632 infrared thermometer.
///
/// The driver owns a [`Transport`] and the emissivity used for object temperatures. Each
/// operation is a blocking sequence of register accesses and sleeps. If a sensor is shared
/// between threads, callers need to serialize whole operations, not just individual accesses.
#[derive(Clone, Debug)]
pub struct Mlx90632<T> {
    pub(crate) transport: T,
    emissivity: Emissivity,
}

impl<T> Mlx90632<T> {
    /// Create a driver without touching the sensor. Call [`init`][Mlx90632::init] before taking
    /// measurements.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            emissivity: Emissivity::default(),
        }
    }

    /// The emissivity used for object temperatures.
    ///
    /// If the emissivity hasn't been set (or was set to 0.0), this is 1.0.
    pub fn emissivity(&self) -> f64 {
        self.emissivity.value()
    }

    pub fn set_emissivity(&mut self, emissivity: f64) {
        self.emissivity = Emissivity::new(emissivity);
    }

    /// Calculate the ambient temperature of a medical range sample.
    pub fn ambient_temperature(
        &self,
        sample: &RawSample,
        calibration: &CalibrationConstants,
    ) -> f64 {
        calculations::ambient_temperature(sample.ambient_new, sample.ambient_old, calibration)
    }

    /// Calculate the ambient temperature of an extended range sample.
    pub fn ambient_temperature_extended(
        &self,
        sample: &ExtendedRawSample,
        calibration: &CalibrationConstants,
    ) -> f64 {
        calculations::ambient_temperature(sample.ambient_new, sample.ambient_old, calibration)
    }

    /// Calculate the object temperature of a medical range sample.
    pub fn object_temperature(&self, sample: &RawSample, calibration: &CalibrationConstants) -> f64 {
        let (object, ambient) = preprocess_sample(sample, calibration);
        calculations::object_temperature(object, ambient, calibration, self.emissivity)
    }

    /// Calculate the object temperature of a medical range sample, compensating for a reflected
    /// temperature (in degrees Celsius) from some other source.
    pub fn object_temperature_reflected(
        &self,
        sample: &RawSample,
        calibration: &CalibrationConstants,
        reflected: f64,
    ) -> f64 {
        let (object, ambient) = preprocess_sample(sample, calibration);
        calculations::object_temperature_reflected(
            object,
            ambient,
            reflected,
            calibration,
            self.emissivity,
        )
    }

    /// Calculate the object temperature of an extended range sample.
    pub fn object_temperature_extended(
        &self,
        sample: &ExtendedRawSample,
        calibration: &CalibrationConstants,
        reflected: f64,
    ) -> f64 {
        let ambient =
            calculations::preprocess_ambient(sample.ambient_new, sample.ambient_old, calibration.gb);
        let object = calculations::preprocess_object_extended(
            sample.object,
            sample.ambient_new,
            sample.ambient_old,
            calibration.ka,
        );
        calculations::object_temperature_extended(
            object,
            ambient,
            reflected,
            calibration,
            self.emissivity,
        )
    }

    /// Consume the driver, returning the transport.
    pub fn release(self) -> T {
        self.transport
    }
}

impl<I2C, D> Mlx90632<I2cTransport<I2C, D>> {
    /// Create a driver for a sensor at `address` on an I²C bus.
    pub fn new_i2c(bus: I2C, address: u8, delay: D) -> Self {
        Self::new(I2cTransport::new(bus, address, delay))
    }
}

fn preprocess_sample(sample: &RawSample, calibration: &CalibrationConstants) -> (f64, f64) {
    let ambient =
        calculations::preprocess_ambient(sample.ambient_new, sample.ambient_old, calibration.gb);
    let object = calculations::preprocess_object(
        sample.object_new,
        sample.object_old,
        sample.ambient_new,
        sample.ambient_old,
        calibration.ka,
    );
    (object, ambient)
}

impl<T> Mlx90632<T>
where
    T: Transport,
{
    /// Check the sensor is supported and prepare it for measurements.
    ///
    /// The EEPROM version must describe a DSPv5 sensor. The data ready flag is cleared, and the
    /// measurement ranges the sensor supports are returned.
    pub fn init(&mut self) -> Result<RangeSupport, Error<T::Error>> {
        let version = self.read_word(EepromAddress::Version.into())?;
        if version & DSP_VERSION_MASK != DSP_VERSION_5 {
            warn!("Unsupported EEPROM version {:#06x}", version);
            return Err(Error::UnsupportedVersion(version));
        }
        let mut status: StatusRegister = self.read_register()?;
        status.clear_data_ready();
        self.write_register(status)?;
        let support = if version & RANGE_KEY_MASK == EXTENDED_RANGE_KEY {
            RangeSupport::Extended
        } else {
            RangeSupport::Medical
        };
        debug!("Sensor version {:#06x} supports {:?} range", version, support);
        Ok(support)
    }

    /// Read the calibration constants from the sensor's EEPROM.
    pub fn calibration(&mut self) -> Result<CalibrationConstants, Error<T::Error>> {
        CalibrationConstants::from_transport(&mut self.transport)
    }

    /// Read a word from the sensor.
    pub fn read_word(&mut self, address: u16) -> Result<u16, Error<T::Error>> {
        self.transport.read(address).map_err(Error::Transport)
    }

    /// Write a word to the sensor.
    ///
    /// EEPROM words can't be written this way, use
    /// [`write_eeprom`][Mlx90632::write_eeprom] instead.
    pub fn write_word(&mut self, address: u16, value: u16) -> Result<(), Error<T::Error>> {
        self.transport.write(address, value).map_err(Error::Transport)
    }

    pub(crate) fn read_register<R: Register>(&mut self) -> Result<R, Error<T::Error>> {
        self.read_word(R::address()).map(R::from)
    }

    pub(crate) fn write_register<R: Register>(&mut self, register: R) -> Result<(), Error<T::Error>> {
        self.write_word(R::address(), register.into())
    }

    /// Read a signed value from the measurement RAM.
    pub(crate) fn read_ram(&mut self, address: u16) -> Result<i16, Error<T::Error>> {
        self.read_word(address).map(|raw| raw as i16)
    }

    /// Send a command to the command register.
    pub(crate) fn command(&mut self, command: u16) -> Result<(), Error<T::Error>> {
        self.write_word(RegisterAddress::Command.into(), command)
    }
}

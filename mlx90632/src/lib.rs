// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! A driver for the Melexis MLX90632 infrared thermometer.
//!
//! The MLX90632 is a small thermopile sensor that reports an ambient (sensor package) temperature
//! and an object temperature for whatever is in its field of view. The sensor doesn't report
//! temperatures directly, instead it provides raw ADC channel readings and a set of calibration
//! constants stored in its EEPROM. This crate reads both and performs the compensation math to
//! get temperatures in degrees Celsius.
//!
//! Two measurement ranges are supported. The medical range covers objects from -20 to 100 ℃, and
//! is supported by all DSPv5 sensors. The extended range goes up to 200 ℃ and is only available
//! on sensors that report support for it (see [`RangeSupport`]). Each range can be measured
//! continuously, or in a burst (sleeping step) mode where the host triggers each measurement.
//!
//! Sensors are usually accessed over I²C with [`Mlx90632::new_i2c`], but anything implementing
//! [`Transport`] will work.
//!
//! ```no_run
//! use linux_embedded_hal::{Delay, I2cdev};
//! use mlx90632::{Mlx90632, DEFAULT_ADDRESS};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = I2cdev::new("/dev/i2c-1")?;
//! let mut sensor = Mlx90632::new_i2c(bus, DEFAULT_ADDRESS, Delay);
//! sensor.init()?;
//! let calibration = sensor.calibration()?;
//! let sample = sensor.read_raw()?;
//! let ambient = sensor.ambient_temperature(&sample, &calibration);
//! let object = sensor.object_temperature(&sample, &calibration);
//! println!("Ambient: {:.2} ℃, object: {:.2} ℃", ambient, object);
//! # Ok(())
//! # }
//! ```
#![no_std]
#![allow(clippy::float_cmp)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("Either the 'std' or 'libm' feature must be enabled.");

pub mod address;
pub mod calculations;
mod driver;
pub mod eeprom;
mod error;
mod measurement;
mod mode;
pub mod register;
pub mod transport;
mod util;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use calculations::Emissivity;

#[doc(inline)]
pub use driver::{Mlx90632, RangeSupport, DSP_VERSION_5};

#[doc(inline)]
pub use eeprom::CalibrationConstants;

#[doc(inline)]
pub use error::Error;

#[doc(inline)]
pub use measurement::{
    select_channels, ExtendedRawSample, RawSample, MAX_EXTENDED_ATTEMPTS, MAX_POLL_ATTEMPTS,
    POLL_INTERVAL_MAX_US, POLL_INTERVAL_MIN_US,
};

#[doc(inline)]
pub use register::{
    ControlRegister, MeasurementMode, MeasurementTable, PowerMode, RefreshRate, StatusRegister,
};

#[doc(inline)]
pub use transport::{I2cTransport, Transport, DEFAULT_ADDRESS};

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
use log::debug;

use crate::address::Command;
use crate::driver::Mlx90632;
use crate::error::Error;
use crate::register::{ControlRegister, MeasurementMode, PowerMode};
use crate::transport::Transport;

/// The time to wait after an addressed reset, in microseconds.
const RESET_DELAY_MIN_US: u32 = 150;
const RESET_DELAY_MAX_US: u32 = 200;

impl<T> Mlx90632<T>
where
    T: Transport,
{
    /// Reset the sensor at this address, leaving the control register as it was.
    pub fn addressed_reset(&mut self) -> Result<(), Error<T::Error>> {
        let original: ControlRegister = self.read_register()?;
        let mut control = original;
        control.set_power_mode(PowerMode::Step);
        self.write_register(control)?;
        self.command(Command::AddressedReset.into())?;
        self.transport
            .sleep_range(RESET_DELAY_MIN_US, RESET_DELAY_MAX_US);
        self.write_register(original)
    }

    /// Switch the sensor to a different measurement mode.
    ///
    /// The sensor is reset, halted while the measurement type is changed, then started in either
    /// sleeping step (burst) or continuous power mode.
    pub fn set_mode(&mut self, mode: MeasurementMode) -> Result<(), Error<T::Error>> {
        debug!("Switching to {:?}", mode);
        self.addressed_reset()?;

        let mut control: ControlRegister = self.read_register()?;
        control.set_measurement_type(mode.measurement_type());
        control.set_power_mode(PowerMode::Halt);
        self.write_register(control)?;

        let mut control: ControlRegister = self.read_register()?;
        control.set_power_mode(mode.power_mode());
        self.write_register(control)
    }

    /// Switch to the mode given by a raw mode code.
    ///
    /// Unknown codes are rejected before the sensor is touched.
    pub fn set_mode_raw(&mut self, code: u8) -> Result<(), Error<T::Error>> {
        let mode = MeasurementMode::try_from(code)
            .map_err(|_| Error::InvalidArgument("unknown measurement mode"))?;
        self.set_mode(mode)
    }

    /// Read the current measurement mode from the sensor.
    pub fn mode(&mut self) -> Result<MeasurementMode, Error<T::Error>> {
        let control: ControlRegister = self.read_register()?;
        MeasurementMode::from_control(control).map_err(Error::InvalidArgument)
    }
}

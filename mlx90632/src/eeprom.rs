// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Calibration constants stored in EEPROM, and rewriting the measurement tables.
use log::debug;

use crate::address::{Command, EepromAddress, EEPROM_RANGE};
use crate::driver::Mlx90632;
use crate::error::Error;
use crate::register::{MeasurementTable, MeasurementTableEntry, RefreshRate, StatusRegister};
use crate::transport::Transport;
use crate::util::i32_from_words;

/// The calibration constants used by the DSPv5 compensation formulas.
///
/// These are factory programmed into each sensor's EEPROM. The names follow the datasheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationConstants {
    pub p_r: i32,
    pub p_g: i32,
    pub p_t: i32,
    pub p_o: i32,
    pub ea: i32,
    pub eb: i32,
    pub fa: i32,
    pub fb: i32,
    pub ga: i32,
    pub gb: i16,
    pub ka: i16,
    pub ha: i16,
    pub hb: i16,
}

impl CalibrationConstants {
    /// The example constants from the datasheet, used by the tests and benchmarks.
    #[doc(hidden)]
    pub const DATASHEET_EXAMPLE: Self = Self {
        p_r: 0x0058_7f5b,
        p_g: 0x04a1_0289,
        p_t: 0xfff9_66f8_u32 as i32,
        p_o: 0x0000_1e0f,
        ea: 4859535,
        eb: 5686508,
        fa: 53855361,
        fb: 42874149,
        ga: -14556410,
        gb: 9728,
        ka: 10752,
        ha: 16384,
        hb: 0,
    };

    /// Read the calibration constants from a sensor.
    pub fn from_transport<T: Transport>(transport: &mut T) -> Result<Self, Error<T::Error>> {
        let calibration = Self::read(transport).map_err(Error::Transport)?;
        debug!("Loaded calibration {:?}", calibration);
        Ok(calibration)
    }

    fn read<T: Transport>(transport: &mut T) -> Result<Self, T::Error> {
        Ok(Self {
            p_r: read_i32(transport, EepromAddress::P_R)?,
            p_g: read_i32(transport, EepromAddress::P_G)?,
            p_t: read_i32(transport, EepromAddress::P_T)?,
            p_o: read_i32(transport, EepromAddress::P_O)?,
            ea: read_i32(transport, EepromAddress::Ea)?,
            eb: read_i32(transport, EepromAddress::Eb)?,
            fa: read_i32(transport, EepromAddress::Fa)?,
            fb: read_i32(transport, EepromAddress::Fb)?,
            ga: read_i32(transport, EepromAddress::Ga)?,
            gb: read_i16(transport, EepromAddress::Gb)?,
            ka: read_i16(transport, EepromAddress::Ka)?,
            ha: read_i16(transport, EepromAddress::Ha)?,
            hb: read_i16(transport, EepromAddress::Hb)?,
        })
    }
}

fn read_i32<T: Transport>(transport: &mut T, address: EepromAddress) -> Result<i32, T::Error> {
    let lsw = transport.read(address.into())?;
    let msw = transport.read(address.next())?;
    Ok(i32_from_words(lsw, msw))
}

fn read_i16<T: Transport>(transport: &mut T, address: EepromAddress) -> Result<i16, T::Error> {
    Ok(transport.read(address.into())? as i16)
}

impl<T> Mlx90632<T>
where
    T: Transport,
{
    fn unlock_eeprom(&mut self) -> Result<(), Error<T::Error>> {
        self.command(Command::EepromUnlock.into())
    }

    /// Wait for an EEPROM write to finish.
    ///
    /// Erasing and programming a word takes a short, fixed amount of time, so there is no limit on
    /// how many times the status is checked.
    fn wait_for_eeprom(&mut self) -> Result<(), Error<T::Error>> {
        loop {
            let status: StatusRegister = self.read_register()?;
            if !status.eeprom_busy() {
                return Ok(());
            }
        }
    }

    fn erase_eeprom(&mut self, address: u16) -> Result<(), Error<T::Error>> {
        self.unlock_eeprom()?;
        self.write_word(address, 0)?;
        self.wait_for_eeprom()
    }

    /// Write a word to EEPROM.
    ///
    /// The word is erased first, then programmed, waiting for each step to complete.
    pub fn write_eeprom(&mut self, address: u16, value: u16) -> Result<(), Error<T::Error>> {
        if !EEPROM_RANGE.contains(&address) {
            return Err(Error::InvalidArgument("address is not in EEPROM"));
        }
        self.erase_eeprom(address)?;
        self.unlock_eeprom()?;
        self.write_word(address, value)?;
        self.wait_for_eeprom()
    }

    /// Set the refresh rate for every entry of a measurement table.
    ///
    /// Entries already at `rate` aren't written. The first failure stops the update, leaving any
    /// later entries untouched.
    pub fn set_refresh_rate(
        &mut self,
        table: MeasurementTable,
        rate: RefreshRate,
    ) -> Result<(), Error<T::Error>> {
        for address in table.entries() {
            let address = u16::from(*address);
            let current = MeasurementTableEntry::from(self.read_word(address)?);
            let updated = current.with_refresh_rate(rate);
            if updated == current {
                debug!("{:#06x} is already at {:?}", address, rate);
                continue;
            }
            debug!(
                "Updating {:#06x} from {:#06x} to {:#06x}",
                address,
                u16::from(current),
                u16::from(updated)
            );
            self.write_eeprom(address, updated.into())?;
        }
        Ok(())
    }

    /// The refresh rate of a measurement table, taken from its first entry.
    pub fn refresh_rate(&mut self, table: MeasurementTable) -> Result<RefreshRate, Error<T::Error>> {
        let first = table.entries()[0];
        let entry = MeasurementTableEntry::from(self.read_word(first.into())?);
        Ok(entry.refresh_rate())
    }
}

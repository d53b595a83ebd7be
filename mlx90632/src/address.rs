// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Memory map of the MLX90632.
//!
//! Every address refers to a 16-bit word. The EEPROM lives from 0x2400 through 0x27FF, the
//! registers from 0x3000 through 0x3FFF and the measurement RAM starts at 0x4000.

use core::ops::RangeInclusive;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The range of addresses backed by EEPROM.
pub const EEPROM_RANGE: RangeInclusive<u16> = 0x2400..=0x27FF;

/// The start of the measurement RAM.
pub const RAM_BASE: u16 = 0x4000;

/// The number of RAM words set aside for each measurement.
pub const RAM_WORDS_PER_MEASUREMENT: u16 = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum EepromAddress {
    /// The EEPROM (and DSP) version word.
    ///
    /// The low byte is the DSP version, the high byte describes which measurement ranges the
    /// sensor supports.
    Version = 0x240B,

    /// The 32-bit constants are split across two words, least significant word first.
    P_R = 0x240C,
    P_G = 0x240E,
    P_T = 0x2410,
    P_O = 0x2412,

    Ea = 0x2424,
    Eb = 0x2426,
    Fa = 0x2428,
    Fb = 0x242A,
    Ga = 0x242C,

    Gb = 0x242E,
    Ka = 0x242F,

    Ha = 0x2481,
    Hb = 0x2482,

    /// The power-on value of the control register.
    Control = 0x24D4,

    /// The power-on value of the I²C address register.
    I2cAddress = 0x24D5,

    MedicalMeasurement1 = 0x24E1,
    MedicalMeasurement2 = 0x24E2,

    ExtendedMeasurement1 = 0x24F1,
    ExtendedMeasurement2 = 0x24F2,
    ExtendedMeasurement3 = 0x24F3,
}

impl EepromAddress {
    /// The address of the word following this one.
    ///
    /// Used to find the most significant word of 32-bit constants.
    pub(crate) fn next(self) -> u16 {
        u16::from(self) + 1
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum RegisterAddress {
    I2cAddress = 0x3000,
    Control = 0x3001,

    /// Writes here are interpreted as commands, like the EEPROM unlock key or a reset request.
    Command = 0x3005,

    Status = 0x3FFF,
}

/// Values written to [`RegisterAddress::Command`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum Command {
    /// Allows the next EEPROM word write to go through.
    EepromUnlock = 0x554C,

    /// Resets the sensor when it is addressed directly.
    AddressedReset = 0x0006,
}

/// The three words of a measurement slot in RAM.
///
/// For the medical range the first two words hold the object signal and the third holds the
/// ambient signal. The extended range combines the first two words of three consecutive slots.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RamWord {
    First,
    Second,
    Third,
}

/// Calculate the address of a word within a measurement slot in RAM.
pub fn ram_address(measurement: u8, word: RamWord) -> u16 {
    let offset = match word {
        RamWord::First => 0,
        RamWord::Second => 1,
        RamWord::Third => 2,
    };
    RAM_BASE + RAM_WORDS_PER_MEASUREMENT * u16::from(measurement) + offset
}

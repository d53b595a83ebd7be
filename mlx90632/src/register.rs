// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Typed views over the sensor's control, status and measurement table words.
//!
//! Each view wraps the raw `u16` so that reserved bits read from the sensor are written back
//! unchanged when a single field is modified.
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::address::{EepromAddress, RegisterAddress};
use crate::util::{get_field, is_bit_set, set_field};

/// Trait for common register functionality.
pub trait Register: From<u16> + Into<u16> + Copy {
    /// The address of this register in the sensor's memory map.
    fn address() -> u16;
}

/// The status register (0x3FFF).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StatusRegister(u16);

impl StatusRegister {
    /// Set by the sensor once a new measurement has been written to RAM.
    pub const DATA_READY_BIT: usize = 0;

    /// The position in the measurement table of the last completed measurement.
    pub const CYCLE_POSITION_MASK: u16 = 0x007C;
    pub const CYCLE_POSITION_SHIFT: u16 = 2;

    pub const BROWN_OUT_BIT: usize = 8;

    /// Set while an EEPROM write (or erase) is in progress.
    pub const EEPROM_BUSY_BIT: usize = 9;

    /// Set while the sensor is running a measurement table.
    pub const DEVICE_BUSY_BIT: usize = 10;

    pub fn data_ready(&self) -> bool {
        is_bit_set(self.0, Self::DATA_READY_BIT)
    }

    /// Clear the data ready flag, ready for the value to be written back to the sensor.
    pub fn clear_data_ready(&mut self) {
        self.0 &= !(1 << Self::DATA_READY_BIT);
    }

    pub fn cycle_position(&self) -> u8 {
        get_field(self.0, Self::CYCLE_POSITION_MASK, Self::CYCLE_POSITION_SHIFT) as u8
    }

    pub fn brown_out(&self) -> bool {
        is_bit_set(self.0, Self::BROWN_OUT_BIT)
    }

    pub fn eeprom_busy(&self) -> bool {
        is_bit_set(self.0, Self::EEPROM_BUSY_BIT)
    }

    pub fn device_busy(&self) -> bool {
        is_bit_set(self.0, Self::DEVICE_BUSY_BIT)
    }
}

impl Register for StatusRegister {
    fn address() -> u16 {
        RegisterAddress::Status.into()
    }
}

impl From<u16> for StatusRegister {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<StatusRegister> for u16 {
    fn from(register: StatusRegister) -> Self {
        register.0
    }
}

/// The power modes of the sensor, stored in bits 1 and 2 of the control register.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum PowerMode {
    /// No measurements are taken.
    Halt = 0,

    /// The sensor sleeps until a measurement table run is requested. Used for burst mode.
    SleepingStep = 1,

    /// The sensor waits for each measurement to be requested.
    Step = 2,

    /// The sensor runs its measurement table over and over.
    Continuous = 3,
}

impl PowerMode {
    fn from_field(field: u16) -> Self {
        match field & 0b11 {
            0 => Self::Halt,
            1 => Self::SleepingStep,
            2 => Self::Step,
            _ => Self::Continuous,
        }
    }
}

/// The control register (0x3001).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ControlRegister(u16);

impl ControlRegister {
    pub const POWER_MODE_MASK: u16 = 0x0006;
    pub const POWER_MODE_SHIFT: u16 = 1;

    /// Start a single measurement in step mode.
    pub const START_SINGLE_BIT: usize = 3;

    /// The measurement type selects which measurement table the sensor runs.
    pub const MEASUREMENT_TYPE_MASK: u16 = 0x01F0;
    pub const MEASUREMENT_TYPE_SHIFT: u16 = 4;

    /// Start a full run of the measurement table in sleeping step mode.
    pub const START_BURST_BIT: usize = 11;

    pub fn power_mode(&self) -> PowerMode {
        PowerMode::from_field(get_field(
            self.0,
            Self::POWER_MODE_MASK,
            Self::POWER_MODE_SHIFT,
        ))
    }

    pub fn set_power_mode(&mut self, mode: PowerMode) {
        self.0 = set_field(
            self.0,
            Self::POWER_MODE_MASK,
            Self::POWER_MODE_SHIFT,
            mode.into(),
        );
    }

    /// The raw 5-bit measurement type.
    pub fn measurement_type(&self) -> u8 {
        get_field(
            self.0,
            Self::MEASUREMENT_TYPE_MASK,
            Self::MEASUREMENT_TYPE_SHIFT,
        ) as u8
    }

    pub fn set_measurement_type(&mut self, measurement_type: u8) {
        self.0 = set_field(
            self.0,
            Self::MEASUREMENT_TYPE_MASK,
            Self::MEASUREMENT_TYPE_SHIFT,
            u16::from(measurement_type),
        );
    }

    pub fn start_single(&self) -> bool {
        is_bit_set(self.0, Self::START_SINGLE_BIT)
    }

    pub fn set_start_single(&mut self) {
        self.0 |= 1 << Self::START_SINGLE_BIT;
    }

    pub fn start_burst(&self) -> bool {
        is_bit_set(self.0, Self::START_BURST_BIT)
    }

    pub fn set_start_burst(&mut self) {
        self.0 |= 1 << Self::START_BURST_BIT;
    }
}

impl Register for ControlRegister {
    fn address() -> u16 {
        RegisterAddress::Control.into()
    }
}

impl From<u16> for ControlRegister {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<ControlRegister> for u16 {
    fn from(register: ControlRegister) -> Self {
        register.0
    }
}

/// The measurement type code for the medical range.
pub const MEASUREMENT_TYPE_MEDICAL: u8 = 0x00;

/// The measurement type code for the extended range.
pub const MEASUREMENT_TYPE_EXTENDED: u8 = 0x11;

/// The measurement modes the driver knows how to use.
///
/// The discriminant is the public mode code: the measurement type, with the top bit set for burst
/// (sleeping step) operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MeasurementMode {
    MedicalContinuous = 0x00,
    ExtendedContinuous = 0x11,
    MedicalBurst = 0x80,
    ExtendedBurst = 0x91,
}

impl MeasurementMode {
    /// The flag set in a mode code for burst modes.
    pub const BURST_FLAG: u8 = 0x80;

    /// The measurement type written to the control register for this mode.
    pub fn measurement_type(self) -> u8 {
        u8::from(self) & !Self::BURST_FLAG
    }

    pub fn is_burst(self) -> bool {
        u8::from(self) & Self::BURST_FLAG != 0
    }

    /// The power mode the sensor is left in when this mode is selected.
    pub fn power_mode(self) -> PowerMode {
        if self.is_burst() {
            PowerMode::SleepingStep
        } else {
            PowerMode::Continuous
        }
    }

    /// The measurement table used by this mode.
    pub fn table(self) -> MeasurementTable {
        match self {
            Self::MedicalContinuous | Self::MedicalBurst => MeasurementTable::Medical,
            Self::ExtendedContinuous | Self::ExtendedBurst => MeasurementTable::Extended,
        }
    }

    /// Decode the current mode from a control register value.
    ///
    /// Only the medical and extended measurement types are recognized, and only in sleeping step
    /// (burst) or continuous power modes.
    pub fn from_control(control: ControlRegister) -> Result<Self, &'static str> {
        let measurement_type = control.measurement_type();
        if measurement_type != MEASUREMENT_TYPE_MEDICAL
            && measurement_type != MEASUREMENT_TYPE_EXTENDED
        {
            return Err("unknown measurement type");
        }
        let code = match control.power_mode() {
            PowerMode::SleepingStep => measurement_type | Self::BURST_FLAG,
            PowerMode::Continuous => measurement_type,
            _ => return Err("unsupported power mode"),
        };
        Self::try_from_primitive(code).map_err(|_| "unknown measurement mode")
    }
}

/// The measurement tables in the sensor EEPROM.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MeasurementTable {
    Medical,
    Extended,
}

impl MeasurementTable {
    /// The EEPROM addresses of each entry in the table, in the order the sensor runs them.
    pub fn entries(self) -> &'static [EepromAddress] {
        match self {
            Self::Medical => &[
                EepromAddress::MedicalMeasurement1,
                EepromAddress::MedicalMeasurement2,
            ],
            Self::Extended => &[
                EepromAddress::ExtendedMeasurement1,
                EepromAddress::ExtendedMeasurement2,
                EepromAddress::ExtendedMeasurement3,
            ],
        }
    }

    /// The cycle position the sensor reports once the last measurement of a table is complete.
    pub fn final_position(self) -> u8 {
        match self {
            Self::Medical => 2,
            Self::Extended => 19,
        }
    }
}

/// The rate at which a measurement is repeated.
///
/// Each step doubles the previous rate, starting at 0.5Hz.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum RefreshRate {
    Half = 0,
    One = 1,
    Two = 2,
    Four = 3,
    Eight = 4,
    Sixteen = 5,
    ThirtyTwo = 6,
    SixtyFour = 7,
}

impl RefreshRate {
    fn from_field(field: u16) -> Self {
        match field & 0b111 {
            0 => Self::Half,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Four,
            4 => Self::Eight,
            5 => Self::Sixteen,
            6 => Self::ThirtyTwo,
            _ => Self::SixtyFour,
        }
    }

    /// How long a single measurement takes at this rate, in milliseconds.
    pub fn measurement_time_ms(self) -> u32 {
        MAX_MEASUREMENT_TIME_MS >> u16::from(self)
    }
}

/// The duration of a measurement at the slowest refresh rate.
pub const MAX_MEASUREMENT_TIME_MS: u32 = 2000;

/// One entry of a measurement table in EEPROM.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MeasurementTableEntry(u16);

impl MeasurementTableEntry {
    pub const REFRESH_RATE_MASK: u16 = 0x0700;
    pub const REFRESH_RATE_SHIFT: u16 = 8;

    pub fn refresh_rate(&self) -> RefreshRate {
        RefreshRate::from_field(get_field(
            self.0,
            Self::REFRESH_RATE_MASK,
            Self::REFRESH_RATE_SHIFT,
        ))
    }

    /// Create a copy of this entry with the refresh rate replaced. All other bits are kept.
    pub fn with_refresh_rate(self, rate: RefreshRate) -> Self {
        Self(set_field(
            self.0,
            Self::REFRESH_RATE_MASK,
            Self::REFRESH_RATE_SHIFT,
            rate.into(),
        ))
    }

    pub fn measurement_time_ms(&self) -> u32 {
        self.refresh_rate().measurement_time_ms()
    }
}

impl From<u16> for MeasurementTableEntry {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<MeasurementTableEntry> for u16 {
    fn from(entry: MeasurementTableEntry) -> Self {
        entry.0
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn status_fields() {
        let status = StatusRegister::from(0x00C5);
        assert!(status.data_ready());
        assert_eq!(status.cycle_position(), 17);
        assert_eq!(StatusRegister::from(0x00C9).cycle_position(), 18);
        assert_eq!(StatusRegister::from(0x00CF).cycle_position(), 19);
        let status = StatusRegister::from(0x0087);
        assert!(status.data_ready());
        assert_eq!(status.cycle_position(), 1);
        assert!(!StatusRegister::from(0x0086).data_ready());
        assert!(StatusRegister::from(0x0200).eeprom_busy());
        assert!(StatusRegister::from(0x0400).device_busy());
        assert!(!StatusRegister::from(0x0200).device_busy());
        assert!(StatusRegister::from(0x0100).brown_out());
    }

    #[test]
    fn status_clear_data_ready_keeps_other_bits() {
        let mut status = StatusRegister::from(0xFFFF);
        status.clear_data_ready();
        assert_eq!(u16::from(status), 0xFFFE);
    }

    #[test]
    fn control_power_mode() {
        let mut control = ControlRegister::from(0xFE0F);
        assert_eq!(control.power_mode(), PowerMode::Continuous);
        control.set_power_mode(PowerMode::Step);
        assert_eq!(u16::from(control), 0xFE0D);
        control.set_power_mode(PowerMode::Halt);
        assert_eq!(u16::from(control), 0xFE09);
        control.set_power_mode(PowerMode::SleepingStep);
        assert_eq!(u16::from(control), 0xFE0B);
    }

    #[test]
    fn control_measurement_type() {
        let mut control = ControlRegister::from(0xFE09);
        assert_eq!(control.measurement_type(), MEASUREMENT_TYPE_MEDICAL);
        control.set_measurement_type(MEASUREMENT_TYPE_EXTENDED);
        assert_eq!(u16::from(control), 0xFF19);
        assert_eq!(control.measurement_type(), MEASUREMENT_TYPE_EXTENDED);
    }

    #[test]
    fn control_start_bits() {
        let mut control = ControlRegister::from(0x0002);
        assert!(!control.start_burst());
        control.set_start_burst();
        assert_eq!(u16::from(control), 0x0802);
        assert!(control.start_burst());
        let mut control = ControlRegister::from(0x0004);
        control.set_start_single();
        assert_eq!(u16::from(control), 0x000C);
        assert!(control.start_single());
    }

    #[test]
    fn mode_codes() {
        assert_eq!(MeasurementMode::try_from(0x91).unwrap(), MeasurementMode::ExtendedBurst);
        assert!(MeasurementMode::try_from(0x01).is_err());
        assert!(MeasurementMode::try_from(0x12).is_err());
        assert_eq!(MeasurementMode::ExtendedBurst.measurement_type(), 0x11);
        assert!(MeasurementMode::MedicalBurst.is_burst());
        assert!(!MeasurementMode::ExtendedContinuous.is_burst());
        assert_eq!(
            MeasurementMode::MedicalBurst.power_mode(),
            PowerMode::SleepingStep
        );
        assert_eq!(
            MeasurementMode::ExtendedBurst.table(),
            MeasurementTable::Extended
        );
    }

    #[test]
    fn mode_from_control() {
        let decode = |raw: u16| MeasurementMode::from_control(ControlRegister::from(raw));
        assert_eq!(decode(0xFE0F), Ok(MeasurementMode::MedicalContinuous));
        assert_eq!(decode(0xFF1F), Ok(MeasurementMode::ExtendedContinuous));
        assert_eq!(decode(0xFE02), Ok(MeasurementMode::MedicalBurst));
        assert_eq!(decode(0xFF12), Ok(MeasurementMode::ExtendedBurst));
        // Burst start bit doesn't change the mode
        assert_eq!(decode(0x0802), Ok(MeasurementMode::MedicalBurst));
        assert!(decode(0xFE9F).is_err());
        assert!(decode(0xFE04).is_err());
        assert!(decode(0xFE00).is_err());
    }

    #[test]
    fn refresh_rate_fields() {
        let entry = MeasurementTableEntry::from(0x820D);
        assert_eq!(entry.refresh_rate(), RefreshRate::Two);
        assert_eq!(entry.measurement_time_ms(), 500);
        let expected = [
            0x800D, 0x810D, 0x820D, 0x830D, 0x840D, 0x850D, 0x860D, 0x870D,
        ];
        for (code, expected) in expected.iter().enumerate() {
            let rate = RefreshRate::try_from(code as u16).unwrap();
            assert_eq!(u16::from(entry.with_refresh_rate(rate)), *expected);
        }
    }

    #[test]
    fn measurement_times() {
        let expected = [2000, 1000, 500, 250, 125, 62, 31, 15];
        for (code, expected) in expected.iter().enumerate() {
            let rate = RefreshRate::try_from(code as u16).unwrap();
            assert_eq!(rate.measurement_time_ms(), *expected);
        }
    }

    #[test]
    fn table_entries() {
        assert_eq!(MeasurementTable::Medical.entries().len(), 2);
        assert_eq!(
            MeasurementTable::Extended.entries()[2],
            EepromAddress::ExtendedMeasurement3
        );
        assert_eq!(MeasurementTable::Extended.final_position(), 19);
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Triggering measurements and reading the raw results out of RAM.
//!
//! The sensor alternates between two RAM slots for each channel of a measurement table, so every
//! raw sample pairs the newest value with the one before it. Which slot is the newest is given by
//! the cycle position in the status register once a measurement completes.
use arrayvec::ArrayVec;
use log::{debug, trace, warn};

use crate::address::{ram_address, RamWord};
use crate::driver::Mlx90632;
use crate::error::Error;
use crate::register::{ControlRegister, MeasurementTable, MeasurementTableEntry, StatusRegister};
use crate::transport::Transport;

/// The number of times the status register is polled before giving up.
pub const MAX_POLL_ATTEMPTS: usize = 100;

/// The shortest time between status polls, in microseconds.
pub const POLL_INTERVAL_MIN_US: u32 = 10_000;

/// The longest time between status polls, in microseconds.
pub const POLL_INTERVAL_MAX_US: u32 = 11_000;

/// The number of measurements started while waiting for the extended table to complete.
pub const MAX_EXTENDED_ATTEMPTS: usize = 3;

/// The largest number of entries in any measurement table.
const MAX_TABLE_ENTRIES: usize = 3;

/// Positions of the extended range measurements in RAM.
const EXTENDED_FIRST: u8 = 17;
const EXTENDED_SECOND: u8 = 18;
const EXTENDED_THIRD: u8 = 19;

/// Raw ambient and object values from a medical range measurement.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RawSample {
    pub ambient_new: i16,
    pub ambient_old: i16,
    pub object_new: i16,
    pub object_old: i16,
}

/// Raw ambient and object values from an extended range measurement.
///
/// The object value is already combined from the three extended measurements.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExtendedRawSample {
    pub ambient_new: i16,
    pub ambient_old: i16,
    pub object: i16,
}

/// Map a medical range cycle position to the (new, old) channels.
pub fn select_channels<E>(position: u8) -> Result<(u8, u8), Error<E>> {
    match position {
        1 => Ok((1, 2)),
        2 => Ok((2, 1)),
        _ => Err(Error::InvalidArgument("channel position must be 1 or 2")),
    }
}

/// Combine the six extended range object readings.
///
/// The result must fit in an `i16`, otherwise the readings are rejected.
fn combine_extended_object<E>(readings: [i16; 6]) -> Result<i16, Error<E>> {
    let [first, second, third, fourth, fifth, sixth] = readings.map(i32::from);
    let combined = (first - second - third + fourth) / 2 + fifth + sixth;
    i16::try_from(combined).map_err(|_| {
        warn!("Extended object value {} overflowed", combined);
        Error::InvalidArgument("extended object value out of range")
    })
}

impl<T> Mlx90632<T>
where
    T: Transport,
{
    /// Poll the status register until `done` returns true, sleeping between attempts.
    fn poll_status<F>(&mut self, done: F) -> Result<StatusRegister, Error<T::Error>>
    where
        F: Fn(&StatusRegister) -> bool,
    {
        for attempt in 0..MAX_POLL_ATTEMPTS {
            let status: StatusRegister = self.read_register()?;
            trace!("Status {:#06x} on attempt {}", u16::from(status), attempt);
            if done(&status) {
                return Ok(status);
            }
            self.transport
                .sleep_range(POLL_INTERVAL_MIN_US, POLL_INTERVAL_MAX_US);
        }
        warn!("Sensor not ready after {} polls", MAX_POLL_ATTEMPTS);
        Err(Error::Timeout)
    }

    /// Clear the data ready flag, letting the sensor signal the next completed measurement.
    pub fn trigger_measurement(&mut self) -> Result<(), Error<T::Error>> {
        let mut status: StatusRegister = self.read_register()?;
        status.clear_data_ready();
        self.write_register(status)
    }

    /// Wait for the data ready flag, returning the cycle position of the new measurement.
    pub fn wait_for_measurement(&mut self) -> Result<u8, Error<T::Error>> {
        let status = self.poll_status(StatusRegister::data_ready)?;
        let position = status.cycle_position();
        debug!("Measurement ready at position {}", position);
        Ok(position)
    }

    /// Trigger a measurement and wait for it, returning the cycle position.
    pub fn start_measurement(&mut self) -> Result<u8, Error<T::Error>> {
        self.trigger_measurement()?;
        self.wait_for_measurement()
    }

    /// The cycle position of the most recent measurement.
    pub fn channel_position(&mut self) -> Result<u8, Error<T::Error>> {
        let status: StatusRegister = self.read_register()?;
        Ok(status.cycle_position())
    }

    /// Read a medical range sample without waiting for a new measurement.
    ///
    /// `position` is the cycle position of the newest measurement, as returned by
    /// [`start_measurement`][Mlx90632::start_measurement] or
    /// [`channel_position`][Mlx90632::channel_position]. In burst mode it is always 2.
    pub fn read_raw_without_wait(&mut self, position: u8) -> Result<RawSample, Error<T::Error>> {
        let (new, old) = select_channels(position)?;
        // Ambient values are always in the same slots
        let ambient_new = self.read_ram(ram_address(1, RamWord::Third))?;
        let ambient_old = self.read_ram(ram_address(2, RamWord::Third))?;
        let object_new = self.read_object(new)?;
        let object_old = self.read_object(old)?;
        Ok(RawSample {
            ambient_new,
            ambient_old,
            object_new,
            object_old,
        })
    }

    /// Average the two object words of a medical measurement slot.
    fn read_object(&mut self, channel: u8) -> Result<i16, Error<T::Error>> {
        let second = i32::from(self.read_ram(ram_address(channel, RamWord::Second))?);
        let first = i32::from(self.read_ram(ram_address(channel, RamWord::First))?);
        // The average of two i16 values always fits
        Ok(((second + first) / 2) as i16)
    }

    /// Take a medical range measurement in continuous mode.
    pub fn read_raw(&mut self) -> Result<RawSample, Error<T::Error>> {
        let position = self.start_measurement()?;
        self.read_raw_without_wait(position)
    }

    /// Take a medical range measurement in burst mode.
    pub fn read_raw_burst(&mut self) -> Result<RawSample, Error<T::Error>> {
        self.start_measurement_burst()?;
        self.read_raw_without_wait(MeasurementTable::Medical.final_position())
    }

    /// Read an extended range sample without waiting for a new measurement.
    pub fn read_raw_extended_without_wait(&mut self) -> Result<ExtendedRawSample, Error<T::Error>> {
        let ambient_new = self.read_ram(ram_address(EXTENDED_FIRST, RamWord::Third))?;
        let ambient_old = self.read_ram(ram_address(EXTENDED_SECOND, RamWord::Third))?;
        let mut readings = [0i16; 6];
        let words = [
            (EXTENDED_FIRST, RamWord::First),
            (EXTENDED_FIRST, RamWord::Second),
            (EXTENDED_SECOND, RamWord::First),
            (EXTENDED_SECOND, RamWord::Second),
            (EXTENDED_THIRD, RamWord::First),
            (EXTENDED_THIRD, RamWord::Second),
        ];
        for (reading, (measurement, word)) in readings.iter_mut().zip(words) {
            *reading = self.read_ram(ram_address(measurement, word))?;
        }
        let object = combine_extended_object(readings)?;
        Ok(ExtendedRawSample {
            ambient_new,
            ambient_old,
            object,
        })
    }

    /// Take an extended range measurement in continuous mode.
    ///
    /// Measurements are started until the last entry of the extended table has been refreshed,
    /// up to [`MAX_EXTENDED_ATTEMPTS`] times.
    pub fn read_raw_extended(&mut self) -> Result<ExtendedRawSample, Error<T::Error>> {
        let final_position = MeasurementTable::Extended.final_position();
        let mut complete = false;
        for _ in 0..MAX_EXTENDED_ATTEMPTS {
            if self.start_measurement()? == final_position {
                complete = true;
                break;
            }
        }
        if !complete {
            warn!("Extended measurement table didn't complete");
            return Err(Error::Timeout);
        }
        self.read_raw_extended_without_wait()
    }

    /// Take an extended range measurement in burst mode.
    pub fn read_raw_extended_burst(&mut self) -> Result<ExtendedRawSample, Error<T::Error>> {
        self.start_measurement_burst()?;
        self.read_raw_extended_without_wait()
    }

    /// How long the measurement described by a table entry takes, in milliseconds.
    pub fn measurement_time(&mut self, entry_address: u16) -> Result<u32, Error<T::Error>> {
        let entry = MeasurementTableEntry::from(self.read_word(entry_address)?);
        Ok(entry.measurement_time_ms())
    }

    /// How long a full run of the current measurement table takes, in milliseconds.
    ///
    /// Only valid in a burst mode. The table entries are each read once before summing. Nothing
    /// stops the table from being rewritten between those reads, so callers changing the refresh
    /// rate from elsewhere need to serialize that with this call.
    pub fn dataset_ready_time(&mut self) -> Result<u32, Error<T::Error>> {
        let mode = self.mode()?;
        if !mode.is_burst() {
            return Err(Error::InvalidArgument(
                "dataset ready time is only defined in burst mode",
            ));
        }
        let mut entries: ArrayVec<MeasurementTableEntry, MAX_TABLE_ENTRIES> = ArrayVec::new();
        for address in mode.table().entries() {
            let entry = MeasurementTableEntry::from(self.read_word((*address).into())?);
            entries.push(entry);
        }
        let total = entries
            .iter()
            .map(MeasurementTableEntry::measurement_time_ms)
            .sum::<u32>();
        debug!("Measurement table takes {}ms in {:?}", total, mode);
        Ok(total)
    }

    /// Ask the sensor to run its measurement table once.
    pub fn trigger_measurement_burst(&mut self) -> Result<(), Error<T::Error>> {
        let mut control: ControlRegister = self.read_register()?;
        control.set_start_burst();
        self.write_register(control)
    }

    /// Wait for the sensor to finish running its measurement table.
    pub fn wait_for_measurement_burst(&mut self) -> Result<(), Error<T::Error>> {
        self.poll_status(|status| !status.device_busy())?;
        Ok(())
    }

    /// Run the measurement table once and wait for it to complete.
    pub fn start_measurement_burst(&mut self) -> Result<(), Error<T::Error>> {
        self.trigger_measurement_burst()?;
        let ready_time = self.dataset_ready_time()?;
        self.transport.sleep_ms(ready_time);
        self.wait_for_measurement_burst()
    }

    /// Start a single measurement in step mode.
    pub fn trigger_measurement_single(&mut self) -> Result<(), Error<T::Error>> {
        self.trigger_measurement()?;
        let mut control: ControlRegister = self.read_register()?;
        control.set_start_single();
        self.write_register(control)
    }
}

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
extern crate alloc;

use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use embedded_hal::blocking::delay::{DelayMs, DelayUs};
use embedded_hal::blocking::i2c;

use crate::address::{Command, RegisterAddress, EEPROM_RANGE};
use crate::register::StatusRegister;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum MockError {
    /// An unknown I2C address was given.
    UnknownI2cAddress(u8),

    /// The transaction wasn't a single word read or write.
    IllegalOperation,

    /// Nothing is stored at the given address.
    UnknownAddress(u16),

    /// An EEPROM word was written without unlocking the EEPROM first.
    LockedEeprom(u16),

    /// An unknown value was written to the command register.
    UnknownCommand(u16),

    /// The failure requested with [`MockDevice::fail_at`].
    Injected,
}

/// Everything the driver asked the device to do, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    Read(u16),
    Write(u16, u16),
    DelayUs(u32),
    DelayMs(u32),
}

#[derive(Debug, Default)]
struct DeviceState {
    memory: BTreeMap<u16, u16>,

    /// Values returned by status reads before falling back to the stored status.
    status_script: VecDeque<u16>,

    eeprom_unlocked: bool,

    /// How many status reads report the EEPROM as busy after each EEPROM write.
    eeprom_busy_reads: usize,

    eeprom_busy_remaining: usize,

    operations: Vec<Operation>,

    /// The index of the bus transaction that should fail.
    fail_at: Option<usize>,

    transactions: usize,
}

/// A simulated MLX90632.
///
/// Clones share the same state, so one copy can be handed to the driver (as both the bus and the
/// delay provider) while the test inspects another.
#[derive(Clone, Debug)]
pub(crate) struct MockDevice {
    i2c_address: u8,
    state: Rc<RefCell<DeviceState>>,
}

impl MockDevice {
    pub(crate) fn new(i2c_address: u8) -> Self {
        Self {
            i2c_address,
            state: Rc::new(RefCell::new(DeviceState::default())),
        }
    }

    /// Set a word without recording an operation.
    pub(crate) fn set_register(&self, address: u16, value: u16) {
        self.state.borrow_mut().memory.insert(address, value);
    }

    pub(crate) fn set_ram(&self, address: u16, value: i16) {
        self.set_register(address, value as u16);
    }

    pub(crate) fn register(&self, address: u16) -> Option<u16> {
        self.state.borrow().memory.get(&address).copied()
    }

    /// Queue up values for the next status register reads.
    pub(crate) fn queue_status(&self, values: &[u16]) {
        self.state
            .borrow_mut()
            .status_script
            .extend(values.iter().copied());
    }

    pub(crate) fn set_eeprom_busy_reads(&self, reads: usize) {
        self.state.borrow_mut().eeprom_busy_reads = reads;
    }

    /// Fail the `transaction`th (counting from 0) read or write.
    pub(crate) fn fail_at(&self, transaction: usize) {
        self.state.borrow_mut().fail_at = Some(transaction);
    }

    pub(crate) fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    pub(crate) fn clear_operations(&self) {
        self.state.borrow_mut().operations.clear();
    }

    fn check_i2c_address(&self, address: u8) -> Result<(), MockError> {
        if address == self.i2c_address {
            Ok(())
        } else {
            Err(MockError::UnknownI2cAddress(address))
        }
    }

    /// Record a bus transaction, failing it if requested.
    fn begin_transaction(&self, operation: Operation) -> Result<(), MockError> {
        let mut state = self.state.borrow_mut();
        state.operations.push(operation);
        let index = state.transactions;
        state.transactions += 1;
        if state.fail_at == Some(index) {
            Err(MockError::Injected)
        } else {
            Ok(())
        }
    }

    fn read_word(&self, address: u16) -> Result<u16, MockError> {
        self.begin_transaction(Operation::Read(address))?;
        let mut state = self.state.borrow_mut();
        if address == u16::from(RegisterAddress::Status) {
            let status = match state.status_script.pop_front() {
                Some(scripted) => scripted,
                None => state.memory.get(&address).copied().unwrap_or_default(),
            };
            if state.eeprom_busy_remaining > 0 {
                state.eeprom_busy_remaining -= 1;
                return Ok(status | (1 << StatusRegister::EEPROM_BUSY_BIT));
            }
            return Ok(status);
        }
        state
            .memory
            .get(&address)
            .copied()
            .ok_or(MockError::UnknownAddress(address))
    }

    fn write_word(&self, address: u16, value: u16) -> Result<(), MockError> {
        self.begin_transaction(Operation::Write(address, value))?;
        let mut state = self.state.borrow_mut();
        if address == u16::from(RegisterAddress::Command) {
            if value == u16::from(Command::EepromUnlock) {
                state.eeprom_unlocked = true;
                return Ok(());
            } else if value == u16::from(Command::AddressedReset) {
                return Ok(());
            }
            return Err(MockError::UnknownCommand(value));
        }
        if EEPROM_RANGE.contains(&address) {
            if !state.eeprom_unlocked {
                return Err(MockError::LockedEeprom(address));
            }
            // The unlock only covers a single write
            state.eeprom_unlocked = false;
            state.eeprom_busy_remaining = state.eeprom_busy_reads;
        }
        state.memory.insert(address, value);
        Ok(())
    }
}

impl i2c::Write for MockDevice {
    type Error = MockError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check_i2c_address(address)?;
        match bytes {
            [address_high, address_low, value_high, value_low] => self.write_word(
                u16::from_be_bytes([*address_high, *address_low]),
                u16::from_be_bytes([*value_high, *value_low]),
            ),
            _ => Err(MockError::IllegalOperation),
        }
    }
}

impl i2c::WriteRead for MockDevice {
    type Error = MockError;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.check_i2c_address(address)?;
        let register = match bytes {
            [high, low] => u16::from_be_bytes([*high, *low]),
            _ => return Err(MockError::IllegalOperation),
        };
        if buffer.len() != 2 {
            return Err(MockError::IllegalOperation);
        }
        let value = self.read_word(register)?;
        buffer.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

impl DelayUs<u32> for MockDevice {
    fn delay_us(&mut self, us: u32) {
        self.state
            .borrow_mut()
            .operations
            .push(Operation::DelayUs(us));
    }
}

impl DelayMs<u32> for MockDevice {
    fn delay_ms(&mut self, ms: u32) {
        self.state
            .borrow_mut()
            .operations
            .push(Operation::DelayMs(ms));
    }
}

#[cfg(test)]
mod test {
    use embedded_hal::blocking::i2c::{Write, WriteRead};

    use super::{MockDevice, MockError, Operation};

    #[test]
    fn status_script_then_stored() {
        let mut mock = MockDevice::new(0x3A);
        mock.set_register(0x3FFF, 0x0004);
        mock.queue_status(&[0x0001]);
        let mut buffer = [0u8; 2];
        mock.write_read(0x3A, &[0x3F, 0xFF], &mut buffer).unwrap();
        assert_eq!(buffer, [0x00, 0x01]);
        mock.write_read(0x3A, &[0x3F, 0xFF], &mut buffer).unwrap();
        assert_eq!(buffer, [0x00, 0x04]);
    }

    #[test]
    fn eeprom_unlock_covers_one_write() {
        let mut mock = MockDevice::new(0x3A);
        mock.write(0x3A, &[0x30, 0x05, 0x55, 0x4C]).unwrap();
        mock.write(0x3A, &[0x24, 0xE1, 0x00, 0x00]).unwrap();
        assert_eq!(
            mock.write(0x3A, &[0x24, 0xE1, 0x82, 0x0D]),
            Err(MockError::LockedEeprom(0x24E1))
        );
        assert_eq!(mock.register(0x24E1), Some(0));
    }

    #[test]
    fn illegal_transactions() {
        let mut mock = MockDevice::new(0x3A);
        let mut buffer = [0u8; 4];
        assert_eq!(
            mock.write_read(0x3A, &[0x3F, 0xFF], &mut buffer),
            Err(MockError::IllegalOperation)
        );
        assert_eq!(
            mock.write(0x3A, &[0x30, 0x01]),
            Err(MockError::IllegalOperation)
        );
        assert_eq!(
            mock.write(0x33, &[0x30, 0x01, 0x00, 0x00]),
            Err(MockError::UnknownI2cAddress(0x33))
        );
        assert!(mock.operations().is_empty());
    }

    #[test]
    fn injected_failure_is_recorded() {
        let mut mock = MockDevice::new(0x3A);
        mock.set_register(0x3001, 0x0006);
        mock.fail_at(1);
        let mut buffer = [0u8; 2];
        assert!(mock.write_read(0x3A, &[0x30, 0x01], &mut buffer).is_ok());
        assert_eq!(
            mock.write_read(0x3A, &[0x30, 0x01], &mut buffer),
            Err(MockError::Injected)
        );
        assert_eq!(mock.operations(), [Operation::Read(0x3001); 2]);
        mock.clear_operations();
        assert!(mock.operations().is_empty());
    }
}

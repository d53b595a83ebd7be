// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
mod mock;

use crate::driver::Mlx90632;
use crate::transport::I2cTransport;

pub(crate) use mock::{MockDevice, MockError, Operation};
pub(crate) use sensor_data::{datasheet_calibration, datasheet_sensor};

pub(crate) type MockTransport = I2cTransport<MockDevice, MockDevice>;

/// An I²C transport talking to `mock`, using it for delays as well.
pub(crate) fn mock_transport(mock: &MockDevice) -> MockTransport {
    I2cTransport::new(mock.clone(), crate::transport::DEFAULT_ADDRESS, mock.clone())
}

pub(crate) fn mock_driver(mock: &MockDevice) -> Mlx90632<MockTransport> {
    Mlx90632::new(mock_transport(mock))
}

// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

/// Errors returned by the MLX90632 driver.
///
/// `E` is the error type of the [`Transport`][crate::Transport] the driver is using. Transport
/// errors are passed through untouched, everything else originates within this library.
#[derive(Clone, PartialEq)]
pub enum Error<E> {
    /// Errors originating from the bus (or whatever else is implementing `Transport`).
    Transport(E),

    /// A value given to, or read from, the sensor doesn't make sense.
    ///
    /// This covers invalid channel positions, unknown measurement type codes, measurement
    /// type/power mode combinations that can't be used, and extended range object values that
    /// don't fit in 16 bits.
    InvalidArgument(&'static str),

    /// The sensor didn't signal completion within the bounded number of polls.
    Timeout,

    /// The EEPROM version word doesn't describe a DSPv5 sensor. The full word is included.
    UnsupportedVersion(u16),
}

// Custom Debug implementation so only the transport error needs to implement Debug.
impl<E> fmt::Debug for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => f.debug_tuple("Error::Transport").field(err).finish(),
            Error::InvalidArgument(msg) => {
                f.debug_tuple("Error::InvalidArgument").field(msg).finish()
            }
            Error::Timeout => f.write_str("Error::Timeout"),
            Error::UnsupportedVersion(version) => f
                .debug_tuple("Error::UnsupportedVersion")
                .field(version)
                .finish(),
        }
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "Transport Error: {:?}", err),
            Error::InvalidArgument(msg) => write!(f, "Invalid Argument: {}", msg),
            Error::Timeout => write!(f, "Timed out waiting for the sensor"),
            Error::UnsupportedVersion(version) => {
                write!(f, "Unsupported EEPROM version {:#06x}", version)
            }
        }
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for Error<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    extern crate std;

    use std::format;

    use super::Error;

    #[test]
    fn display() {
        let err: Error<()> = Error::UnsupportedVersion(0x0103);
        assert_eq!(format!("{}", err), "Unsupported EEPROM version 0x0103");
        let err: Error<()> = Error::InvalidArgument("bad channel");
        assert_eq!(format!("{}", err), "Invalid Argument: bad channel");
    }

    #[test]
    fn debug_transport() {
        let err: Error<u8> = Error::Transport(5);
        assert_eq!(format!("{:?}", err), "Error::Transport(5)");
        let err: Error<u8> = Error::Timeout;
        assert_eq!(format!("{:?}", err), "Error::Timeout");
    }
}

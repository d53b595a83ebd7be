use std::env;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{bail, Context};
use linux_embedded_hal::{Delay, I2cdev};

use mlx90632::{MeasurementMode, Mlx90632, RangeSupport, DEFAULT_ADDRESS};

fn parse_address(arg: &str) -> anyhow::Result<u8> {
    let address = match arg.strip_prefix("0x") {
        Some(hex_digits) => u8::from_str_radix(hex_digits, 16)?,
        None => arg.parse()?,
    };
    Ok(address)
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let address = match args.len() {
        2 => DEFAULT_ADDRESS,
        3 => parse_address(&args[2]).context("The address should be an integer")?,
        _ => bail!("Usage: {} <I2C bus> [sensor address]", args[0]),
    };
    let bus_path = Path::new(&args[1]);
    let bus = I2cdev::new(bus_path).context("The given path should work as an I2C device")?;
    let mut sensor = Mlx90632::new_i2c(bus, address, Delay);

    let support = sensor.init()?;
    let calibration = sensor.calibration()?;
    let mode = match support {
        RangeSupport::Medical => MeasurementMode::MedicalContinuous,
        RangeSupport::Extended => MeasurementMode::ExtendedContinuous,
    };
    sensor.set_mode(mode)?;
    println!("Measuring in {:?}", mode);

    let delay = Duration::from_millis(500);
    loop {
        let (ambient, object) = match mode {
            MeasurementMode::ExtendedContinuous => {
                let sample = sensor.read_raw_extended()?;
                let ambient = sensor.ambient_temperature_extended(&sample, &calibration);
                // Without a second sensor, the ambient temperature stands in for the reflected
                // temperature.
                let object = sensor.object_temperature_extended(&sample, &calibration, ambient);
                (ambient, object)
            }
            _ => {
                let sample = sensor.read_raw()?;
                (
                    sensor.ambient_temperature(&sample, &calibration),
                    sensor.object_temperature(&sample, &calibration),
                )
            }
        };
        println!("Ambient: {:6.2}℃  Object: {:6.2}℃", ambient, object);
        sleep(delay);
    }
}

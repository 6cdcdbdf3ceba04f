//! PCT2075 board temperature sensor via the kernel `lm75` hwmon driver.

use std::path::{Path, PathBuf};

use gambit_core::error::SensorError;
use gambit_core::sensor::{Sensor, TemperatureReading};

use crate::sysfs;

const DEVICE: &str = "PCT2075";

/// hwmon temperatures are reported in millidegrees Celsius.
const MILLI: f64 = 1000.0;

#[derive(Debug)]
pub struct Pct2075 {
    temp_input: PathBuf,
}

impl Pct2075 {
    /// Bind to the PCT2075 at `address` below the sysfs `root`.
    pub fn open(root: &Path, bus: Option<u8>, address: u8) -> Result<Self, SensorError> {
        let device = sysfs::find_i2c_device(root, bus, address, DEVICE)?;
        let hwmon = sysfs::find_child(&device, "hwmon/hwmon*", DEVICE, address)?;
        let temp_input = sysfs::require_attribute(&hwmon, "temp1_input", DEVICE, address)?;
        Ok(Self { temp_input })
    }
}

impl Sensor for Pct2075 {
    type Reading = TemperatureReading;

    fn read(&mut self) -> Result<TemperatureReading, SensorError> {
        let celsius = sysfs::read_number(&self.temp_input)? / MILLI;
        Ok(TemperatureReading { celsius })
    }
}

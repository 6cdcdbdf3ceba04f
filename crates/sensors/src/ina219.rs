//! INA219 UPS power monitor via the kernel `ina2xx` hwmon driver.
//!
//! The driver exposes the shunt drop as `in0_input` and the bus voltage as
//! `in1_input` (both mV) and the current as `curr1_input` (mA, signed).

use std::path::{Path, PathBuf};

use gambit_core::error::SensorError;
use gambit_core::sensor::{PowerReading, Sensor};

use crate::sysfs;

const DEVICE: &str = "INA219";

const MILLI: f64 = 1000.0;

#[derive(Debug)]
pub struct Ina219 {
    shunt_input: PathBuf,
    bus_input: PathBuf,
    current_input: PathBuf,
}

impl Ina219 {
    /// Bind to the INA219 at `address` below the sysfs `root`.
    pub fn open(root: &Path, bus: Option<u8>, address: u8) -> Result<Self, SensorError> {
        let device = sysfs::find_i2c_device(root, bus, address, DEVICE)?;
        let hwmon = sysfs::find_child(&device, "hwmon/hwmon*", DEVICE, address)?;
        Ok(Self {
            shunt_input: sysfs::require_attribute(&hwmon, "in0_input", DEVICE, address)?,
            bus_input: sysfs::require_attribute(&hwmon, "in1_input", DEVICE, address)?,
            current_input: sysfs::require_attribute(&hwmon, "curr1_input", DEVICE, address)?,
        })
    }
}

impl Sensor for Ina219 {
    type Reading = PowerReading;

    fn read(&mut self) -> Result<PowerReading, SensorError> {
        Ok(PowerReading {
            bus_voltage_v: sysfs::read_number(&self.bus_input)? / MILLI,
            shunt_voltage_v: sysfs::read_number(&self.shunt_input)? / MILLI,
            current_ma: sysfs::read_number(&self.current_input)?,
        })
    }
}

//! MCP9601 thermocouple amplifier via the kernel `mcp9600` IIO driver.
//!
//! The thermocouple type is fixed by the device tree (`thermocouple-type`)
//! when the driver binds; it cannot be changed from userspace, so `open`
//! only checks that it agrees with the configured type.

use std::io;
use std::path::{Path, PathBuf};

use gambit_core::config::ThermocoupleType;
use gambit_core::error::SensorError;
use gambit_core::sensor::{Sensor, ThermocoupleReading};

use crate::sysfs;

const DEVICE: &str = "MCP9601";

/// IIO temperature scale yields millidegrees Celsius.
const MILLI: f64 = 1000.0;

/// `thermocouple-type` cell values of the `microchip,mcp9600` binding.
const DT_THERMOCOUPLE_TYPES: [ThermocoupleType; 8] = [
    ThermocoupleType::B,
    ThermocoupleType::E,
    ThermocoupleType::J,
    ThermocoupleType::K,
    ThermocoupleType::N,
    ThermocoupleType::R,
    ThermocoupleType::S,
    ThermocoupleType::T,
];

#[derive(Debug)]
pub struct Mcp9601 {
    hot_raw: PathBuf,
    ambient_raw: PathBuf,
    scale: PathBuf,
}

impl Mcp9601 {
    /// Bind to the MCP9601 at `address` below the sysfs `root`, failing if
    /// the driver was configured for a thermocouple other than `expected`.
    pub fn open(
        root: &Path,
        bus: Option<u8>,
        address: u8,
        expected: ThermocoupleType,
    ) -> Result<Self, SensorError> {
        let device = sysfs::find_i2c_device(root, bus, address, DEVICE)?;

        let bound = bound_thermocouple_type(&device)?;
        if bound != expected {
            return Err(SensorError::ThermocoupleMismatch {
                configured: expected,
                bound,
            });
        }

        let iio = sysfs::find_child(&device, "iio:device*", DEVICE, address)?;
        Ok(Self {
            hot_raw: sysfs::require_attribute(&iio, "in_temp_object_raw", DEVICE, address)?,
            ambient_raw: sysfs::require_attribute(&iio, "in_temp_ambient_raw", DEVICE, address)?,
            scale: sysfs::require_attribute(&iio, "in_temp_scale", DEVICE, address)?,
        })
    }
}

/// The type the driver programmed into the chip. Without the device-tree
/// property the driver falls back to type K.
fn bound_thermocouple_type(device: &Path) -> Result<ThermocoupleType, SensorError> {
    let path = device.join("of_node/thermocouple-type");
    let raw = match std::fs::read(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ThermocoupleType::K),
        Err(source) => return Err(SensorError::Io { path, source }),
    };

    // Device-tree cells are big-endian u32.
    <[u8; 4]>::try_from(raw.as_slice())
        .ok()
        .map(u32::from_be_bytes)
        .and_then(|cell| usize::try_from(cell).ok())
        .and_then(|index| DT_THERMOCOUPLE_TYPES.get(index).copied())
        .inspect(|t| {
            tracing::debug!(path = %path.display(), thermocouple_type = %t, "Device-tree thermocouple type");
        })
        .ok_or_else(|| SensorError::Malformed {
            raw: format!("{raw:02x?}"),
            path,
        })
}

impl Sensor for Mcp9601 {
    type Reading = ThermocoupleReading;

    fn read(&mut self) -> Result<ThermocoupleReading, SensorError> {
        let scale = sysfs::read_number(&self.scale)?;
        Ok(ThermocoupleReading {
            hot_junction_c: sysfs::read_number(&self.hot_raw)? * scale / MILLI,
            ambient_c: sysfs::read_number(&self.ambient_raw)? * scale / MILLI,
        })
    }
}

//! Locating kernel-bound I2C devices and reading their sysfs attributes.
//!
//! Devices live under `<root>/bus/i2c/devices/<bus>-<addr>` where `<addr>`
//! is the 7-bit address as four lowercase hex digits (`1-0041`). The root is
//! `/sys` in production and a temporary directory in tests.

use std::path::{Path, PathBuf};

use gambit_core::error::SensorError;
use glob::{glob, Pattern};

/// Where sysfs is mounted on a real system.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Find the sysfs directory of the I2C device at `address`.
///
/// With `bus == None` every bus is searched and the first match wins.
pub fn find_i2c_device(
    root: &Path,
    bus: Option<u8>,
    address: u8,
    device: &'static str,
) -> Result<PathBuf, SensorError> {
    let bus = bus.map_or_else(|| "*".to_string(), |b| b.to_string());
    let pattern = format!(
        "{}/bus/i2c/devices/{bus}-{address:04x}",
        Pattern::escape(&root.to_string_lossy())
    );

    first_dir(&pattern)
        .inspect(|path| tracing::debug!(device, path = %path.display(), "Found I2C device"))
        .ok_or(SensorError::NotFound { device, address })
}

/// Find a driver-created child directory such as `hwmon/hwmon*` or
/// `iio:device*` below a device directory.
pub fn find_child(
    device_dir: &Path,
    child_pattern: &str,
    device: &'static str,
    address: u8,
) -> Result<PathBuf, SensorError> {
    let pattern = format!(
        "{}/{child_pattern}",
        Pattern::escape(&device_dir.to_string_lossy())
    );
    first_dir(&pattern).ok_or_else(|| {
        tracing::warn!(
            device,
            path = %device_dir.display(),
            "Device present but no driver interface found -- is the kernel driver bound?",
        );
        SensorError::NotFound { device, address }
    })
}

fn first_dir(pattern: &str) -> Option<PathBuf> {
    let paths = match glob(pattern) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Invalid sysfs glob pattern");
            return None;
        }
    };

    let mut matches: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Error accessing sysfs path");
                None
            }
        })
        .filter(|path| path.is_dir())
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Read a sysfs attribute holding a single decimal number.
pub fn read_number(path: &Path) -> Result<f64, SensorError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SensorError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SensorError::Malformed {
            path: path.to_path_buf(),
            raw: trimmed.to_string(),
        })
}

/// Fail early if a required attribute is missing, so a misconfigured device
/// is caught at startup rather than as a stream of read failures.
pub fn require_attribute(
    dir: &Path,
    name: &str,
    device: &'static str,
    address: u8,
) -> Result<PathBuf, SensorError> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        tracing::warn!(device, path = %path.display(), "Expected sysfs attribute is missing");
        Err(SensorError::NotFound { device, address })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn device_directory_uses_four_hex_digits() {
        let root = tempfile::tempdir().unwrap();
        let dev = root.path().join("bus/i2c/devices/1-0037");
        fs::create_dir_all(&dev).unwrap();

        let found = find_i2c_device(root.path(), None, 0x37, "PCT2075").unwrap();
        assert_eq!(found, dev);
    }

    #[test]
    fn bus_filter_is_honoured() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("bus/i2c/devices/0-0041")).unwrap();
        fs::create_dir_all(root.path().join("bus/i2c/devices/7-0041")).unwrap();

        let found = find_i2c_device(root.path(), Some(7), 0x41, "INA219").unwrap();
        assert!(found.ends_with("7-0041"));

        assert_matches!(
            find_i2c_device(root.path(), Some(3), 0x41, "INA219"),
            Err(SensorError::NotFound { address: 0x41, .. })
        );
    }

    #[test]
    fn read_number_trims_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp1_input");
        fs::write(&path, "42125\n").unwrap();
        assert_eq!(read_number(&path).unwrap(), 42125.0);
    }

    #[test]
    fn read_number_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp1_input");
        fs::write(&path, "n/a\n").unwrap();
        assert_matches!(read_number(&path), Err(SensorError::Malformed { raw, .. }) if raw == "n/a");
    }

    #[test]
    fn read_number_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            read_number(&dir.path().join("gone")),
            Err(SensorError::Io { .. })
        );
    }
}

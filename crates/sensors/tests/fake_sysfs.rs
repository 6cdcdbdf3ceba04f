//! Drivers read against a fake sysfs tree laid out like the kernel's.

use std::fs;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use gambit_core::config::ThermocoupleType;
use gambit_core::error::SensorError;
use gambit_core::sensor::Sensor;
use gambit_sensors::{Ina219, Mcp9601, Pct2075};

fn device_dir(root: &Path, bus: u8, address: u8) -> PathBuf {
    root.join(format!("bus/i2c/devices/{bus}-{address:04x}"))
}

fn write_attrs(dir: &Path, attrs: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, value) in attrs {
        fs::write(dir.join(name), format!("{value}\n")).unwrap();
    }
}

#[test]
fn pct2075_reads_millidegrees() {
    let root = tempfile::tempdir().unwrap();
    let hwmon = device_dir(root.path(), 1, 0x37).join("hwmon/hwmon3");
    write_attrs(&hwmon, &[("temp1_input", "72125")]);

    let mut sensor = Pct2075::open(root.path(), None, 0x37).unwrap();
    let reading = sensor.read().unwrap();
    assert!((reading.celsius - 72.125).abs() < 1e-9);

    fs::write(hwmon.join("temp1_input"), "81000\n").unwrap();
    assert!((sensor.read().unwrap().celsius - 81.0).abs() < 1e-9);
}

#[test]
fn ina219_combines_bus_and_shunt() {
    let root = tempfile::tempdir().unwrap();
    let hwmon = device_dir(root.path(), 1, 0x41).join("hwmon/hwmon2");
    write_attrs(
        &hwmon,
        &[
            ("in0_input", "50"),
            ("in1_input", "11500"),
            ("curr1_input", "-730"),
        ],
    );

    let mut sensor = Ina219::open(root.path(), Some(1), 0x41).unwrap();
    let reading = sensor.read().unwrap();

    assert!((reading.voltage() - 11.55).abs() < 1e-9);
    assert_eq!(reading.current_ma, -730.0);
    assert!(!reading.is_charging());
}

#[test]
fn mcp9601_applies_iio_scale() {
    let root = tempfile::tempdir().unwrap();
    let iio = device_dir(root.path(), 1, 0x67).join("iio:device0");
    write_attrs(
        &iio,
        &[
            ("in_temp_object_raw", "1000"),
            ("in_temp_ambient_raw", "400"),
            ("in_temp_scale", "62.500000"),
        ],
    );

    let mut sensor = Mcp9601::open(root.path(), None, 0x67, ThermocoupleType::K).unwrap();
    let reading = sensor.read().unwrap();

    assert!((reading.hot_junction_c - 62.5).abs() < 1e-9);
    assert!((reading.ambient_c - 25.0).abs() < 1e-9);
}

fn mcp9601_tree(root: &Path, dt_type: Option<u32>) {
    let device = device_dir(root, 1, 0x67);
    write_attrs(
        &device.join("iio:device1"),
        &[
            ("in_temp_object_raw", "400"),
            ("in_temp_ambient_raw", "400"),
            ("in_temp_scale", "62.500000"),
        ],
    );
    if let Some(cell) = dt_type {
        let of_node = device.join("of_node");
        fs::create_dir_all(&of_node).unwrap();
        fs::write(of_node.join("thermocouple-type"), cell.to_be_bytes()).unwrap();
    }
}

#[test]
fn mcp9601_accepts_the_device_tree_thermocouple_type() {
    let root = tempfile::tempdir().unwrap();
    // 2 is type J in the mcp9600 binding.
    mcp9601_tree(root.path(), Some(2));

    assert!(Mcp9601::open(root.path(), None, 0x67, ThermocoupleType::J).is_ok());
    assert_matches!(
        Mcp9601::open(root.path(), None, 0x67, ThermocoupleType::K),
        Err(SensorError::ThermocoupleMismatch {
            configured: ThermocoupleType::K,
            bound: ThermocoupleType::J,
        })
    );
}

#[test]
fn mcp9601_without_device_tree_property_is_type_k() {
    let root = tempfile::tempdir().unwrap();
    mcp9601_tree(root.path(), None);

    assert!(Mcp9601::open(root.path(), None, 0x67, ThermocoupleType::K).is_ok());
    let err = Mcp9601::open(root.path(), None, 0x67, ThermocoupleType::T).unwrap_err();
    assert_eq!(
        err.to_string(),
        "thermocouple_type T does not match the type-K the driver was bound with"
    );
}

#[test]
fn mcp9601_rejects_unknown_device_tree_value() {
    let root = tempfile::tempdir().unwrap();
    mcp9601_tree(root.path(), Some(9));

    assert_matches!(
        Mcp9601::open(root.path(), None, 0x67, ThermocoupleType::K),
        Err(SensorError::Malformed { .. })
    );
}

#[test]
fn absent_device_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    assert_matches!(
        Pct2075::open(root.path(), None, 0x37),
        Err(SensorError::NotFound { device: "PCT2075", address: 0x37 })
    );
}

#[test]
fn device_without_bound_driver_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(device_dir(root.path(), 1, 0x41)).unwrap();
    assert_matches!(
        Ina219::open(root.path(), None, 0x41),
        Err(SensorError::NotFound { device: "INA219", .. })
    );
}

#[test]
fn vanished_attribute_becomes_a_read_error() {
    let root = tempfile::tempdir().unwrap();
    let hwmon = device_dir(root.path(), 1, 0x37).join("hwmon/hwmon0");
    write_attrs(&hwmon, &[("temp1_input", "20000")]);

    let mut sensor = Pct2075::open(root.path(), None, 0x37).unwrap();
    fs::remove_file(hwmon.join("temp1_input")).unwrap();

    assert_matches!(sensor.read(), Err(SensorError::Io { .. }));
}

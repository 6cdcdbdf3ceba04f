use std::path::PathBuf;

use crate::config::ThermocoupleType;

/// Startup configuration failures. All of them are fatal: the monitor
/// reports the message once and exits non-zero.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML in config file: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("No '{0}' section in config file")]
    MissingSection(&'static str),

    #[error("'{0}' section in config file must be a mapping of settings")]
    InvalidSection(&'static str),

    #[error("{field} ('{value}') must be a number")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} ('{value}') must be an integer")]
    NotAnInteger { field: &'static str, value: String },

    #[error("Invalid i2c_address '{0}'")]
    InvalidAddress(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Errors raised while talking to a sensor.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("No {device} found at I2C address 0x{address:02X}")]
    NotFound { device: &'static str, address: u8 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed value in {}: '{raw}'", path.display())]
    Malformed { path: PathBuf, raw: String },

    #[error(
        "thermocouple_type {configured} does not match the type-{bound} the driver was bound with"
    )]
    ThermocoupleMismatch {
        configured: ThermocoupleType,
        bound: ThermocoupleType,
    },
}

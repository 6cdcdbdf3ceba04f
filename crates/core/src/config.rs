//! Safety monitor configuration.
//!
//! All monitors share one YAML file with a top-level section per sensor:
//!
//! ```yaml
//! pct2075:
//!   i2c_address: "0x37"
//!   warning_temp_c: 70
//!   shutdown_temp_c: 80
//!   poll_interval_s: 5
//! ina219:
//!   i2c_address: 0x41
//!   warning_battery_percent: 15
//!   shutdown_battery_percent: 5
//!   battery_cell_count: 3
//! ```
//!
//! Values are loosely typed: numeric strings are accepted wherever a number
//! is expected, and any field left out falls back to the sensor's default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde_yaml::Value;

use crate::battery::{DEFAULT_CELL_COUNT, MAX_CELL_COUNT};
use crate::error::ConfigError;
use crate::thresholds::{Direction, Thresholds};

/// Location of the shared config file on a deployed unit.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gambit/safety-config.yaml";

/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
pub const CONFIG_PATH_ENV: &str = "GAMBIT_SAFETY_CONFIG";

/// Highest valid 7-bit I2C address.
pub const MAX_I2C_ADDRESS: u8 = 0x7F;

/// Config file path from [`CONFIG_PATH_ENV`], or the default.
pub fn resolve_config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// ---------------------------------------------------------------------------
// Sensor kinds
// ---------------------------------------------------------------------------

/// The three monitored sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// PCT2075 board temperature sensor.
    Pct2075,
    /// MCP9601 thermocouple amplifier.
    Mcp9601,
    /// INA219 UPS battery monitor.
    Ina219,
}

impl SensorKind {
    /// Top-level key of this sensor's section in the config file.
    pub const fn section(self) -> &'static str {
        match self {
            Self::Pct2075 => "pct2075",
            Self::Mcp9601 => "mcp9601",
            Self::Ina219 => "ina219",
        }
    }

    /// Human-readable part name used in log lines and shutdown reasons.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pct2075 => "PCT2075",
            Self::Mcp9601 => "MCP9601",
            Self::Ina219 => "INA219",
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::Pct2075 | Self::Mcp9601 => Direction::Rising,
            Self::Ina219 => Direction::Falling,
        }
    }

    pub const fn warning_field(self) -> &'static str {
        match self {
            Self::Pct2075 | Self::Mcp9601 => "warning_temp_c",
            Self::Ina219 => "warning_battery_percent",
        }
    }

    pub const fn shutdown_field(self) -> &'static str {
        match self {
            Self::Pct2075 | Self::Mcp9601 => "shutdown_temp_c",
            Self::Ina219 => "shutdown_battery_percent",
        }
    }

    /// Unit suffix for the monitored quantity.
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Pct2075 | Self::Mcp9601 => "C",
            Self::Ina219 => "%",
        }
    }

    const fn default_address(self) -> u8 {
        match self {
            Self::Pct2075 => 0x37,
            Self::Mcp9601 => 0x67,
            Self::Ina219 => 0x41,
        }
    }

    /// `(warning, shutdown, poll_interval_s)`
    const fn default_limits(self) -> (f64, f64, f64) {
        match self {
            Self::Pct2075 => (70.0, 80.0, 5.0),
            Self::Mcp9601 => (60.0, 75.0, 5.0),
            Self::Ina219 => (15.0, 5.0, 10.0),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Thermocouple types
// ---------------------------------------------------------------------------

/// Thermocouple types supported by the MCP9601.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThermocoupleType {
    #[default]
    K,
    J,
    T,
    N,
    S,
    E,
    B,
    R,
}

impl ThermocoupleType {
    pub const ALL: [Self; 8] = [
        Self::K,
        Self::J,
        Self::T,
        Self::N,
        Self::S,
        Self::E,
        Self::B,
        Self::R,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::K => "K",
            Self::J => "J",
            Self::T => "T",
            Self::N => "N",
            Self::S => "S",
            Self::E => "E",
            Self::B => "B",
            Self::R => "R",
        }
    }
}

impl FromStr for ThermocoupleType {
    type Err = ConfigError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                ConfigError::Validation(format!(
                    "Invalid thermocouple_type '{wanted}'. Valid types: {}",
                    valid.join(", ")
                ))
            })
    }
}

impl fmt::Display for ThermocoupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Monitor configuration
// ---------------------------------------------------------------------------

/// Settings that only apply to one kind of sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSettings {
    Temperature,
    Thermocouple { thermocouple_type: ThermocoupleType },
    Battery { cell_count: u8 },
}

/// Configuration of one monitor, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub kind: SensorKind,
    /// Restrict device lookup to this I2C bus; any bus when `None`.
    pub i2c_bus: Option<u8>,
    pub i2c_address: u8,
    /// °C for temperature monitors, percent for the battery monitor.
    pub warning_threshold: f64,
    pub shutdown_threshold: f64,
    pub poll_interval: Duration,
    pub settings: SensorSettings,
}

impl MonitorConfig {
    /// Built-in defaults for `kind`, used for every key the file omits.
    pub fn defaults(kind: SensorKind) -> Self {
        let (warning, shutdown, poll_s) = kind.default_limits();
        let settings = match kind {
            SensorKind::Pct2075 => SensorSettings::Temperature,
            SensorKind::Mcp9601 => SensorSettings::Thermocouple {
                thermocouple_type: ThermocoupleType::default(),
            },
            SensorKind::Ina219 => SensorSettings::Battery {
                cell_count: DEFAULT_CELL_COUNT,
            },
        };

        Self {
            kind,
            i2c_bus: None,
            i2c_address: kind.default_address(),
            warning_threshold: warning,
            shutdown_threshold: shutdown,
            poll_interval: Duration::from_secs_f64(poll_s),
            settings,
        }
    }

    /// Load and validate `kind`'s section of the config file at `path`.
    pub fn load(kind: SensorKind, path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_yaml_str(kind, &text)
    }

    /// Parse a whole config document and pick out `kind`'s section.
    pub fn from_yaml_str(kind: SensorKind, text: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(text)?;
        let section = root
            .get(kind.section())
            .ok_or(ConfigError::MissingSection(kind.section()))?;
        Self::from_section(kind, section)
    }

    /// Build a config from one sensor section, coercing and validating
    /// every field.
    pub fn from_section(kind: SensorKind, section: &Value) -> Result<Self, ConfigError> {
        let section = section
            .as_mapping()
            .ok_or(ConfigError::InvalidSection(kind.section()))?;
        let mut config = Self::defaults(kind);
        let field = |name: &str| section.get(name).filter(|v| !v.is_null());

        if let Some(v) = field("i2c_address") {
            config.i2c_address = parse_i2c_address(v)?;
        }
        if let Some(v) = field("i2c_bus") {
            config.i2c_bus = Some(coerce_u8("i2c_bus", v)?);
        }
        if let Some(v) = field(kind.warning_field()) {
            config.warning_threshold = coerce_f64(kind.warning_field(), v)?;
        }
        if let Some(v) = field(kind.shutdown_field()) {
            config.shutdown_threshold = coerce_f64(kind.shutdown_field(), v)?;
        }
        if let Some(v) = field("poll_interval_s") {
            let secs = coerce_f64("poll_interval_s", v)?;
            config.poll_interval = poll_interval_from_secs(secs)?;
        }

        match kind {
            SensorKind::Pct2075 => {}
            SensorKind::Mcp9601 => {
                if let Some(v) = field("thermocouple_type") {
                    config.settings = SensorSettings::Thermocouple {
                        thermocouple_type: render(v).parse()?,
                    };
                }
            }
            SensorKind::Ina219 => {
                if let Some(v) = field("battery_cell_count") {
                    config.settings = SensorSettings::Battery {
                        cell_count: coerce_cell_count(v)?,
                    };
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every cross-field invariant. Called by the loaders; call it
    /// yourself when building a config by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.i2c_address > MAX_I2C_ADDRESS {
            return Err(ConfigError::InvalidAddress(format!("0x{:02X}", self.i2c_address)));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "poll_interval_s must be greater than 0".to_string(),
            ));
        }

        Thresholds::new(self.kind, self.warning_threshold, self.shutdown_threshold)?;

        match (self.kind, self.settings) {
            (SensorKind::Pct2075, SensorSettings::Temperature)
            | (SensorKind::Mcp9601, SensorSettings::Thermocouple { .. }) => Ok(()),
            (SensorKind::Ina219, SensorSettings::Battery { cell_count }) => {
                if (1..=MAX_CELL_COUNT).contains(&cell_count) {
                    Ok(())
                } else {
                    Err(ConfigError::Validation(format!(
                        "battery_cell_count ({cell_count}) must be between 1 and {MAX_CELL_COUNT}"
                    )))
                }
            }
            (kind, settings) => Err(ConfigError::Validation(format!(
                "{settings:?} settings do not apply to the {kind} monitor"
            ))),
        }
    }

    /// Validated thresholds for the monitor loop.
    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        Thresholds::new(self.kind, self.warning_threshold, self.shutdown_threshold)
    }

    /// Series cell count of the monitored pack; the default for non-battery
    /// monitors.
    pub fn cell_count(&self) -> u8 {
        match self.settings {
            SensorSettings::Battery { cell_count } => cell_count,
            _ => DEFAULT_CELL_COUNT,
        }
    }

    pub fn thermocouple_type(&self) -> Option<ThermocoupleType> {
        match self.settings {
            SensorSettings::Thermocouple { thermocouple_type } => Some(thermocouple_type),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Parse an I2C address from YAML.
///
/// Strings are always hexadecimal, with or without a `0x` prefix
/// (`"0x37"` and `"37"` are both 0x37); integers are taken as-is.
pub fn parse_i2c_address(value: &Value) -> Result<u8, ConfigError> {
    let invalid = || ConfigError::InvalidAddress(render(value));

    let address = match value {
        Value::Number(n) => n.as_u64().ok_or_else(invalid)?,
        Value::String(s) => {
            let s = s.trim();
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            u64::from_str_radix(digits, 16).map_err(|_| invalid())?
        }
        _ => return Err(invalid()),
    };

    u8::try_from(address)
        .ok()
        .filter(|a| *a <= MAX_I2C_ADDRESS)
        .ok_or_else(invalid)
}

/// Parse an I2C address typed on a command line: `0x`-prefixed hex or
/// plain decimal (`"0x42"` and `"66"` are the same device).
pub fn parse_cli_address(s: &str) -> Result<u8, ConfigError> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed
        .ok()
        .filter(|a| *a <= MAX_I2C_ADDRESS)
        .ok_or_else(|| ConfigError::InvalidAddress(s.to_string()))
}

/// Coerce a YAML scalar to a float, naming `field` on failure.
pub fn coerce_f64(field: &'static str, value: &Value) -> Result<f64, ConfigError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::NotANumber {
            field,
            value: render(value),
        })
}

/// Coerce a YAML scalar to a small non-negative integer, naming `field` on
/// failure.
pub fn coerce_u8(field: &'static str, value: &Value) -> Result<u8, ConfigError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let not_an_integer = || ConfigError::NotAnInteger {
        field,
        value: render(value),
    };
    let n = parsed.ok_or_else(not_an_integer)?;
    u8::try_from(n).map_err(|_| {
        ConfigError::Validation(format!("{field} ({n}) is out of range"))
    })
}

/// Like [`coerce_u8`], but a count too large (or negative) for a `u8` gets
/// the same range message as [`MonitorConfig::validate`].
fn coerce_cell_count(value: &Value) -> Result<u8, ConfigError> {
    match coerce_u8("battery_cell_count", value) {
        Err(ConfigError::Validation(_)) => Err(ConfigError::Validation(format!(
            "battery_cell_count ({}) must be between 1 and {MAX_CELL_COUNT}",
            render(value)
        ))),
        other => other,
    }
}

fn poll_interval_from_secs(secs: f64) -> Result<Duration, ConfigError> {
    if secs <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_s ({secs}) must be greater than 0"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::Validation(format!("poll_interval_s ({secs}) is out of range"))
    })
}

/// Render a YAML scalar the way the user wrote it, for error messages.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn address_from_hex_string() {
        assert_eq!(parse_i2c_address(&yaml("\"0x37\"")).unwrap(), 0x37);
        assert_eq!(parse_i2c_address(&yaml("\"0X67\"")).unwrap(), 0x67);
    }

    #[test]
    fn address_string_without_prefix_is_hex() {
        assert_eq!(parse_i2c_address(&yaml("\"41\"")).unwrap(), 0x41);
    }

    #[test]
    fn address_from_integer() {
        assert_eq!(parse_i2c_address(&yaml("55")).unwrap(), 55);
        // YAML 1.2 hex literals arrive as integers.
        assert_eq!(parse_i2c_address(&yaml("0x41")).unwrap(), 0x41);
    }

    #[test]
    fn address_rejects_garbage_and_out_of_range() {
        assert_matches!(
            parse_i2c_address(&yaml("\"zz\"")),
            Err(ConfigError::InvalidAddress(v)) if v == "zz"
        );
        assert!(parse_i2c_address(&yaml("\"0x80\"")).is_err());
        assert!(parse_i2c_address(&yaml("-1")).is_err());
        assert!(parse_i2c_address(&yaml("true")).is_err());
    }

    #[test]
    fn cli_address_accepts_hex_and_decimal() {
        assert_eq!(parse_cli_address("0x42").unwrap(), 0x42);
        assert_eq!(parse_cli_address("66").unwrap(), 66);
        assert!(parse_cli_address("invalid").is_err());
        assert!(parse_cli_address("200").is_err());
    }

    #[test]
    fn coerce_float_accepts_numeric_strings() {
        assert_eq!(coerce_f64("warning_temp_c", &yaml("\"60\"")).unwrap(), 60.0);
        assert_eq!(coerce_f64("warning_temp_c", &yaml("72.5")).unwrap(), 72.5);
    }

    #[test]
    fn coerce_float_names_the_field() {
        let err = coerce_f64("warning_temp_c", &yaml("\"not-a-number\"")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "warning_temp_c ('not-a-number') must be a number"
        );
    }

    #[test]
    fn coerce_int_accepts_numeric_strings() {
        assert_eq!(coerce_u8("battery_cell_count", &yaml("\"3\"")).unwrap(), 3);
    }

    #[test]
    fn coerce_int_names_the_field() {
        assert_matches!(
            coerce_u8("battery_cell_count", &yaml("abc")),
            Err(ConfigError::NotAnInteger { field: "battery_cell_count", .. })
        );
    }

    #[test]
    fn thermocouple_type_is_case_insensitive() {
        assert_eq!("k".parse::<ThermocoupleType>().unwrap(), ThermocoupleType::K);
        assert_eq!(" r ".parse::<ThermocoupleType>().unwrap(), ThermocoupleType::R);
        for t in ThermocoupleType::ALL {
            assert_eq!(t.as_str().parse::<ThermocoupleType>().unwrap(), t);
        }
    }

    #[test]
    fn thermocouple_type_rejects_unknown() {
        let err = "X".parse::<ThermocoupleType>().unwrap_err();
        assert!(err.to_string().contains("Invalid thermocouple_type 'X'"));
    }

    #[test]
    fn defaults_are_valid() {
        for kind in [SensorKind::Pct2075, SensorKind::Mcp9601, SensorKind::Ina219] {
            MonitorConfig::defaults(kind).validate().unwrap();
        }
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let section = yaml("poll_interval_s: 0");
        assert_matches!(
            MonitorConfig::from_section(SensorKind::Pct2075, &section),
            Err(ConfigError::Validation(msg)) if msg.contains("poll_interval_s")
        );
    }

    #[test]
    fn mismatched_settings_are_rejected() {
        let mut config = MonitorConfig::defaults(SensorKind::Pct2075);
        config.settings = SensorSettings::Battery { cell_count: 3 };
        assert!(config.validate().is_err());
    }
}

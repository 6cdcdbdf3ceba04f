//! Sensor capability interface and the readings each monitor consumes.
//!
//! The monitor core only ever sees a [`Sensor`]; concrete hardware access
//! lives in `gambit-sensors`, and tests substitute scripted doubles.

use std::fmt;

use crate::battery::battery_percent;
use crate::config::MonitorConfig;
use crate::error::SensorError;

/// Something that can be polled for one reading at a time.
pub trait Sensor {
    type Reading: Observation + fmt::Debug;

    /// Take one sample. Any I/O failure is reported as an error; the caller
    /// owns the retry/escalation policy.
    fn read(&mut self) -> Result<Self::Reading, SensorError>;
}

/// How a reading maps onto the single quantity compared against thresholds.
pub trait Observation {
    /// The quantity the thresholds apply to (°C or battery %).
    fn monitored_value(&self, config: &MonitorConfig) -> f64;

    /// `true` when the reading itself rules out a shutdown (a charging pack).
    fn suppresses_shutdown(&self) -> bool {
        false
    }
}

/// PCT2075 sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureReading {
    pub celsius: f64,
}

impl Observation for TemperatureReading {
    fn monitored_value(&self, _config: &MonitorConfig) -> f64 {
        self.celsius
    }
}

/// MCP9601 sample: the thermocouple (hot junction) and the amplifier's own
/// cold-junction temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermocoupleReading {
    pub hot_junction_c: f64,
    /// Logged for context only.
    pub ambient_c: f64,
}

impl Observation for ThermocoupleReading {
    fn monitored_value(&self, _config: &MonitorConfig) -> f64 {
        self.hot_junction_c
    }
}

/// INA219 sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerReading {
    pub bus_voltage_v: f64,
    pub shunt_voltage_v: f64,
    /// Positive while charging, negative while discharging.
    pub current_ma: f64,
}

impl PowerReading {
    /// Battery terminal voltage: load side plus the drop across the shunt.
    pub fn voltage(&self) -> f64 {
        self.bus_voltage_v + self.shunt_voltage_v
    }

    pub fn is_charging(&self) -> bool {
        self.current_ma > 0.0
    }

    /// Absolute power in watts.
    pub fn power_w(&self) -> f64 {
        (self.voltage() * self.current_ma / 1000.0).abs()
    }

    pub fn battery_percent(&self, cell_count: u8) -> f64 {
        battery_percent(self.voltage(), cell_count)
    }
}

impl Observation for PowerReading {
    fn monitored_value(&self, config: &MonitorConfig) -> f64 {
        self.battery_percent(config.cell_count())
    }

    fn suppresses_shutdown(&self) -> bool {
        self.is_charging()
    }
}

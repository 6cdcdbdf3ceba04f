//! Warning/shutdown threshold pairs and the direction in which they trip.

use crate::config::SensorKind;
use crate::error::ConfigError;

/// Which way a quantity moves as it becomes unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Higher is worse (temperature).
    Rising,
    /// Lower is worse (battery percent).
    Falling,
}

/// A validated warning/shutdown pair.
///
/// The warning limit is always strictly less severe than the shutdown limit,
/// so the warning band is never empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    warning: f64,
    shutdown: f64,
    direction: Direction,
}

impl Thresholds {
    /// Build the thresholds for `kind`, rejecting a pair in the wrong order.
    pub fn new(kind: SensorKind, warning: f64, shutdown: f64) -> Result<Self, ConfigError> {
        if !warning.is_finite() {
            return Err(ConfigError::NotANumber {
                field: kind.warning_field(),
                value: warning.to_string(),
            });
        }
        if !shutdown.is_finite() {
            return Err(ConfigError::NotANumber {
                field: kind.shutdown_field(),
                value: shutdown.to_string(),
            });
        }

        let direction = kind.direction();
        let ordered = match direction {
            Direction::Rising => warning < shutdown,
            Direction::Falling => warning > shutdown,
        };
        if !ordered {
            let relation = match direction {
                Direction::Rising => "less than",
                Direction::Falling => "greater than",
            };
            return Err(ConfigError::Validation(format!(
                "{} ({warning}) must be {relation} {} ({shutdown})",
                kind.warning_field(),
                kind.shutdown_field(),
            )));
        }

        Ok(Self {
            warning,
            shutdown,
            direction,
        })
    }

    pub fn warning(&self) -> f64 {
        self.warning
    }

    pub fn shutdown(&self) -> f64 {
        self.shutdown
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// `value` is at or beyond the shutdown limit.
    pub fn at_shutdown(&self, value: f64) -> bool {
        self.reached(value, self.shutdown)
    }

    /// `value` is at or beyond the warning limit.
    pub fn at_warning(&self, value: f64) -> bool {
        self.reached(value, self.warning)
    }

    fn reached(&self, value: f64, limit: f64) -> bool {
        match self.direction {
            Direction::Rising => value >= limit,
            Direction::Falling => value <= limit,
        }
    }
}

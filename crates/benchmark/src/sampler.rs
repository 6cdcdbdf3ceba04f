//! INA219 sampling with the same failure ceiling as the safety monitors.
//!
//! A failed read is never fatal here: it is counted, logged, and the caller
//! simply skips that sample.

use gambit_core::monitor::{FailureOutcome, MonitorState, MAX_CONSECUTIVE_FAILURES};
use gambit_core::sensor::{PowerReading, Sensor};

/// One successful sample with the derived quantities the benchmark reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub voltage_v: f64,
    pub current_ma: f64,
    pub power_w: f64,
    pub battery_pct: f64,
    pub charging: bool,
}

impl Sample {
    pub fn from_reading(reading: &PowerReading, cell_count: u8) -> Self {
        Self {
            voltage_v: reading.voltage(),
            current_ma: reading.current_ma,
            power_w: reading.power_w(),
            battery_pct: reading.battery_percent(cell_count),
            charging: reading.is_charging(),
        }
    }

    /// Discharging at or below `threshold` percent.
    pub fn reached(&self, threshold: f64) -> bool {
        !self.charging && self.battery_pct <= threshold
    }
}

pub struct PowerSampler<S> {
    sensor: S,
    cell_count: u8,
    state: MonitorState,
}

impl<S> PowerSampler<S>
where
    S: Sensor<Reading = PowerReading>,
{
    pub fn new(sensor: S, cell_count: u8) -> Self {
        Self {
            sensor,
            cell_count,
            state: MonitorState::new(),
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.consecutive_failures()
    }

    /// Take one sample, or `None` if the read failed.
    pub fn sample(&mut self) -> Option<Sample> {
        match self.sensor.read() {
            Ok(reading) => {
                self.state.record_success();
                Some(Sample::from_reading(&reading, self.cell_count))
            }
            Err(e) => {
                match self.state.record_failure() {
                    FailureOutcome::Counted(n) => tracing::error!(
                        error = %e,
                        "Sensor read failed ({n}/{MAX_CONSECUTIVE_FAILURES})",
                    ),
                    FailureOutcome::CeilingReached => {
                        tracing::error!(
                            error = %e,
                            "Sensor read failed ({MAX_CONSECUTIVE_FAILURES}/{MAX_CONSECUTIVE_FAILURES})",
                        );
                        tracing::error!(
                            critical = true,
                            "Sensor read failed {MAX_CONSECUTIVE_FAILURES} consecutive times. \
                             Hardware may be disconnected.",
                        );
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use gambit_core::error::SensorError;

    use super::*;

    struct Scripted(VecDeque<Result<PowerReading, SensorError>>);

    impl Sensor for Scripted {
        type Reading = PowerReading;

        fn read(&mut self) -> Result<PowerReading, SensorError> {
            self.0.pop_front().unwrap_or(Err(SensorError::NotFound {
                device: "INA219",
                address: 0x41,
            }))
        }
    }

    fn reading(volts: f64, current_ma: f64) -> PowerReading {
        PowerReading {
            bus_voltage_v: volts,
            shunt_voltage_v: 0.0,
            current_ma,
        }
    }

    #[test]
    fn sample_derives_power_and_percent() {
        let sample = Sample::from_reading(&reading(10.8, -1500.0), 3);
        assert!((sample.battery_pct - 50.0).abs() < 1e-9);
        assert!((sample.power_w - 16.2).abs() < 1e-9);
        assert!(!sample.charging);
    }

    #[test]
    fn threshold_only_counts_while_discharging() {
        let low = Sample::from_reading(&reading(9.0, -500.0), 3);
        let low_charging = Sample::from_reading(&reading(9.0, 500.0), 3);
        assert!(low.reached(10.0));
        assert!(!low_charging.reached(10.0));
    }

    #[test]
    fn failures_are_counted_and_reset_at_ceiling() {
        let mut sampler = PowerSampler::new(Scripted(VecDeque::new()), 3);
        for expected in 1..MAX_CONSECUTIVE_FAILURES {
            assert!(sampler.sample().is_none());
            assert_eq!(sampler.consecutive_failures(), expected);
        }
        assert!(sampler.sample().is_none());
        assert_eq!(sampler.consecutive_failures(), 0);
    }

    #[test]
    fn success_resets_failure_count() {
        let script = VecDeque::from([
            Err(SensorError::NotFound {
                device: "INA219",
                address: 0x41,
            }),
            Ok(reading(11.0, -700.0)),
        ]);
        let mut sampler = PowerSampler::new(Scripted(script), 3);
        assert!(sampler.sample().is_none());
        assert!(sampler.sample().is_some());
        assert_eq!(sampler.consecutive_failures(), 0);
    }
}

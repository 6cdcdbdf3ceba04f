//! The polling loop shared by all three safety monitors.
//!
//! Each cycle reads the sensor once, evaluates the reading and acts on the
//! result, then sleeps for the configured poll interval. The loop only ends
//! after a shutdown has been requested.

use std::time::Duration;

use gambit_core::config::MonitorConfig;
use gambit_core::error::{ConfigError, SensorError};
use gambit_core::monitor::{
    evaluate_value, Action, FailureOutcome, MonitorState, MAX_CONSECUTIVE_FAILURES,
};
use gambit_core::sensor::{
    Observation, PowerReading, Sensor, TemperatureReading, ThermocoupleReading,
};
use gambit_core::thresholds::{Direction, Thresholds};

use crate::shutdown::{ShutdownIssuer, POST_SHUTDOWN_WAIT};

/// Per-cycle log line for a successful reading.
pub trait ReadingLog {
    fn log(&self, config: &MonitorConfig);
}

impl ReadingLog for TemperatureReading {
    fn log(&self, _config: &MonitorConfig) {
        tracing::info!(celsius = self.celsius, "Temperature: {:.1}C", self.celsius);
    }
}

impl ReadingLog for ThermocoupleReading {
    fn log(&self, _config: &MonitorConfig) {
        tracing::info!(
            hot_c = self.hot_junction_c,
            ambient_c = self.ambient_c,
            "Temperature: hot={:.1}C, ambient={:.1}C",
            self.hot_junction_c,
            self.ambient_c,
        );
    }
}

impl ReadingLog for PowerReading {
    fn log(&self, config: &MonitorConfig) {
        let percent = self.battery_percent(config.cell_count());
        let status = if self.is_charging() {
            "charging"
        } else {
            "discharging"
        };
        tracing::info!(
            percent,
            voltage = self.voltage(),
            current_ma = self.current_ma,
            "Battery: {percent:.1}% ({:.2}V), {:.0}mA {status}",
            self.voltage(),
            self.current_ma.abs(),
        );
    }
}

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The sensor was read and the reading evaluated.
    Evaluated(Action),
    /// The read failed and was counted.
    ReadFailed(FailureOutcome),
}

/// One monitor instance: a sensor, its config, loop state and a way to
/// power the host off.
pub struct Monitor<S, I> {
    sensor: S,
    config: MonitorConfig,
    thresholds: Thresholds,
    state: MonitorState,
    issuer: I,
    post_shutdown_wait: Duration,
}

impl<S, I> Monitor<S, I>
where
    S: Sensor,
    S::Reading: ReadingLog,
    I: ShutdownIssuer,
{
    pub fn new(sensor: S, config: MonitorConfig, issuer: I) -> Result<Self, ConfigError> {
        config.validate()?;
        let thresholds = config.thresholds()?;
        Ok(Self {
            sensor,
            config,
            thresholds,
            state: MonitorState::new(),
            issuer,
            post_shutdown_wait: POST_SHUTDOWN_WAIT,
        })
    }

    /// Override how long [`run`](Self::run) waits after requesting shutdown.
    pub fn with_post_shutdown_wait(mut self, wait: Duration) -> Self {
        self.post_shutdown_wait = wait;
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Poll until a shutdown has been requested, then wait out the grace
    /// period. The caller is expected to exit non-zero afterwards.
    pub async fn run(mut self) {
        loop {
            if let CycleOutcome::Evaluated(Action::Shutdown) = self.poll_once().await {
                tracing::info!(
                    wait_secs = self.post_shutdown_wait.as_secs(),
                    "Waiting for system shutdown",
                );
                tokio::time::sleep(self.post_shutdown_wait).await;
                return;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One read-evaluate-act cycle, without the trailing sleep.
    ///
    /// A shutdown-level reading requests the shutdown before returning.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let reading = match self.sensor.read() {
            Ok(reading) => reading,
            Err(e) => return CycleOutcome::ReadFailed(self.record_failure(&e)),
        };

        reading.log(&self.config);

        let value = reading.monitored_value(&self.config);
        let gated = reading.suppresses_shutdown();
        let action = evaluate_value(value, gated, &self.thresholds, &mut self.state);

        match action {
            Action::None => {}
            Action::WarnRaised => self.log_warning(value, gated),
            Action::WarnCleared => self.log_recovery(value),
            Action::Shutdown => self.shutdown(value).await,
        }

        CycleOutcome::Evaluated(action)
    }

    fn record_failure(&mut self, error: &SensorError) -> FailureOutcome {
        let outcome = self.state.record_failure();
        let count = match outcome {
            FailureOutcome::Counted(n) => n,
            FailureOutcome::CeilingReached => MAX_CONSECUTIVE_FAILURES,
        };

        tracing::error!(
            sensor = %self.config.kind,
            error = %error,
            "Failed to read sensor ({count}/{MAX_CONSECUTIVE_FAILURES})",
        );

        if outcome == FailureOutcome::CeilingReached {
            tracing::error!(
                critical = true,
                sensor = %self.config.kind,
                "Sensor read failed {MAX_CONSECUTIVE_FAILURES} consecutive times. \
                 Hardware may be disconnected. NOT triggering shutdown.",
            );
        }

        outcome
    }

    fn log_warning(&self, value: f64, gated: bool) {
        let warning = self.thresholds.warning();
        let unit = self.config.kind.unit();
        match self.thresholds.direction() {
            Direction::Rising => tracing::warn!(
                value,
                threshold = warning,
                "HIGH TEMPERATURE WARNING: {value:.1}{unit} >= {warning}{unit}",
            ),
            Direction::Falling if gated && self.thresholds.at_shutdown(value) => tracing::warn!(
                value,
                threshold = self.thresholds.shutdown(),
                "LOW BATTERY WARNING: {value:.1}{unit} <= {}{unit} while charging; shutdown suppressed",
                self.thresholds.shutdown(),
            ),
            Direction::Falling => tracing::warn!(
                value,
                threshold = warning,
                "LOW BATTERY WARNING: {value:.1}{unit} <= {warning}{unit}",
            ),
        }
    }

    fn log_recovery(&self, value: f64) {
        let unit = self.config.kind.unit();
        match self.thresholds.direction() {
            Direction::Rising => {
                tracing::info!(value, "Temperature returned to safe level: {value:.1}{unit}")
            }
            Direction::Falling => tracing::info!(value, "Battery level recovered: {value:.1}{unit}"),
        }
    }

    async fn shutdown(&self, value: f64) {
        let reason = shutdown_reason(&self.config, &self.thresholds, value);
        tracing::error!(critical = true, "INITIATING SHUTDOWN: {reason}");

        if let Err(e) = self.issuer.request_shutdown(&reason).await {
            tracing::error!(error = %e, "Failed to initiate shutdown");
        }
    }
}

/// Human-readable reason embedded in the shutdown broadcast.
pub fn shutdown_reason(config: &MonitorConfig, thresholds: &Thresholds, value: f64) -> String {
    let limit = thresholds.shutdown();
    let unit = config.kind.unit();
    match thresholds.direction() {
        Direction::Rising => format!(
            "{} temperature {value:.1}{unit} >= {limit}{unit}",
            config.kind.label()
        ),
        Direction::Falling => format!("Battery level {value:.1}{unit} <= {limit}{unit}"),
    }
}

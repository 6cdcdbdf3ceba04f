//! Threshold evaluation with a warning latch and a read-failure ceiling.
//!
//! Pure logic: no I/O, no clocks. The monitor loop reads the sensor, calls
//! [`evaluate`] on success or [`MonitorState::record_failure`] on error, and
//! acts on the outcome.

use crate::config::MonitorConfig;
use crate::error::ConfigError;
use crate::sensor::Observation;
use crate::thresholds::Thresholds;

/// Consecutive read failures tolerated before escalating.
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// What the loop should do after evaluating one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    WarnRaised,
    WarnCleared,
    Shutdown,
}

/// Result of recording a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Below the ceiling; carries the running count.
    Counted(u32),
    /// The ceiling was hit. The counter has already been reset.
    CeilingReached,
}

/// Mutable state of one monitor loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    consecutive_failures: u32,
    warning_active: bool,
    /// A shutdown-level reading was seen while shutdown was gated off
    /// (charging) and has already been reported.
    shutdown_suppressed: bool,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn warning_active(&self) -> bool {
        self.warning_active
    }

    /// Reset the failure count after a good read.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Count a failed read. The warning latch is left untouched.
    pub fn record_failure(&mut self) -> FailureOutcome {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
            self.consecutive_failures = 0;
            FailureOutcome::CeilingReached
        } else {
            FailureOutcome::Counted(self.consecutive_failures)
        }
    }
}

/// Evaluate one successful reading against `config`'s thresholds.
pub fn evaluate<R: Observation>(
    reading: &R,
    config: &MonitorConfig,
    state: &mut MonitorState,
) -> Result<Action, ConfigError> {
    let thresholds = config.thresholds()?;
    Ok(evaluate_value(
        reading.monitored_value(config),
        reading.suppresses_shutdown(),
        &thresholds,
        state,
    ))
}

/// Evaluate an already-derived quantity.
///
/// `shutdown_gated` blocks the shutdown action for this reading. A gated
/// shutdown-level reading is reported once as a warning instead, even if a
/// warning is already latched, and then stays quiet until the quantity backs
/// off the shutdown limit.
pub fn evaluate_value(
    value: f64,
    shutdown_gated: bool,
    thresholds: &Thresholds,
    state: &mut MonitorState,
) -> Action {
    state.record_success();

    if thresholds.at_shutdown(value) {
        if !shutdown_gated {
            return Action::Shutdown;
        }
        state.warning_active = true;
        if state.shutdown_suppressed {
            return Action::None;
        }
        state.shutdown_suppressed = true;
        return Action::WarnRaised;
    }
    state.shutdown_suppressed = false;

    if thresholds.at_warning(value) {
        if state.warning_active {
            return Action::None;
        }
        state.warning_active = true;
        return Action::WarnRaised;
    }

    if state.warning_active {
        state.warning_active = false;
        return Action::WarnCleared;
    }

    Action::None
}

//! The benchmark run: validate, load the CPU, sample until done, tear down.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use gambit_core::sensor::{PowerReading, Sensor};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::pool::{WorkerLauncher, WorkerPool};
use crate::profile::{target_workers, LoadProfile, Profile};
use crate::recorder::{Recorder, RecordError, RowContext, START_NOTE};
use crate::sampler::{PowerSampler, Sample};

/// What a run needs besides its sensor and pool.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub profile: Profile,
    /// Stop once discharging at or below this battery percent.
    pub threshold: f64,
    pub interval: Duration,
    /// Dwell per load level (cyclic only).
    pub cycle_duration: Duration,
    pub cell_count: u8,
    /// Where the CSV record goes; `None` disables it.
    pub record_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to get initial sensor reading")]
    InitialRead,

    #[error("Threshold ({threshold}%) >= current battery ({current:.1}%)")]
    ThresholdNotBelowBattery { threshold: f64, current: f64 },

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Why the sampling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ThresholdReached,
    Interrupted,
}

/// End-of-run figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub stop: StopReason,
    pub elapsed: Duration,
    pub samples: usize,
    /// Percent at the first recorded sample.
    pub start_pct: Option<f64>,
    /// Percent from a final reading after the workers stopped.
    pub end_pct: Option<f64>,
}

impl Summary {
    pub fn log(&self) {
        tracing::info!("{}", "-".repeat(50));
        tracing::info!(
            samples = self.samples,
            stop = ?self.stop,
            "Test complete: {:.1}s elapsed",
            self.elapsed.as_secs_f64()
        );
        if let (Some(start), Some(end)) = (self.start_pct, self.end_pct) {
            tracing::info!("Battery: {start:.1}% -> {end:.1}%");
        }
    }
}

/// Resolve when SIGINT or SIGTERM arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}

pub struct Runner<S, L: WorkerLauncher> {
    settings: RunSettings,
    sampler: PowerSampler<S>,
    pool: WorkerPool<L>,
    cancel: CancellationToken,
    recorder: Option<Recorder>,
}

impl<S, L> Runner<S, L>
where
    S: Sensor<Reading = PowerReading>,
    L: WorkerLauncher,
{
    /// `cancel` stops the run at the next sample boundary.
    pub fn new(
        settings: RunSettings,
        sensor: S,
        pool: WorkerPool<L>,
        cancel: CancellationToken,
    ) -> Self {
        let sampler = PowerSampler::new(sensor, settings.cell_count);
        Self {
            settings,
            sampler,
            pool,
            cancel,
            recorder: None,
        }
    }

    /// Run to completion. The pool is always empty when this returns.
    pub async fn run(mut self) -> Result<Summary, RunError> {
        let initial = self.sampler.sample().ok_or(RunError::InitialRead)?;
        if self.settings.threshold >= initial.battery_pct {
            return Err(RunError::ThresholdNotBelowBattery {
                threshold: self.settings.threshold,
                current: initial.battery_pct,
            });
        }

        tracing::info!(
            "Starting UPS benchmark: profile={}, threshold={}%, interval={}s",
            self.settings.profile,
            self.settings.threshold,
            self.settings.interval.as_secs_f64(),
        );
        tracing::info!(
            "System: {} cores, battery at {:.1}% ({:.2}V)",
            self.pool.max_workers(),
            initial.battery_pct,
            initial.voltage_v,
        );
        match self.settings.profile {
            Profile::Stress => tracing::info!("Starting stress profile (100% CPU on all cores)"),
            Profile::Cyclic => tracing::info!(
                "Starting cyclic profile (cycle duration: {}s per level)",
                self.settings.cycle_duration.as_secs_f64()
            ),
        }

        if let Some(dir) = &self.settings.record_dir {
            self.recorder = Some(Recorder::create(dir, self.settings.profile, Local::now())?);
        }

        let started = Instant::now();
        let mut progress = Progress::default();
        let stop = self.sample_until_stopped(started, &mut progress).await;

        self.pool.shutdown().await;

        let summary = Summary {
            stop,
            elapsed: started.elapsed(),
            samples: progress.samples,
            start_pct: progress.start_pct,
            end_pct: self.sampler.sample().map(|s| s.battery_pct),
        };
        summary.log();
        Ok(summary)
    }

    async fn sample_until_stopped(
        &mut self,
        started: Instant,
        progress: &mut Progress,
    ) -> StopReason {
        let mut load =
            LoadProfile::new(self.settings.profile, self.settings.cycle_duration, started);

        loop {
            if self.cancel.is_cancelled() {
                return StopReason::Interrupted;
            }

            let level = load.level(Instant::now());
            let workers = self
                .pool
                .set_worker_count(target_workers(self.pool.max_workers(), level))
                .await;

            if let Some(sample) = self.sampler.sample() {
                let notes = if progress.start_pct.is_none() {
                    progress.start_pct = Some(sample.battery_pct);
                    START_NOTE
                } else {
                    ""
                };
                progress.samples += 1;
                self.report(&sample, started.elapsed(), level, workers, notes);

                if sample.reached(self.settings.threshold) {
                    tracing::info!(
                        "Battery threshold reached ({:.1}% <= {}%)",
                        sample.battery_pct,
                        self.settings.threshold
                    );
                    return StopReason::ThresholdReached;
                }
            }

            tokio::select! {
                () = self.cancel.cancelled() => return StopReason::Interrupted,
                () = tokio::time::sleep(self.settings.interval) => {}
            }
        }
    }

    fn report(
        &mut self,
        sample: &Sample,
        elapsed: Duration,
        level: u8,
        workers: usize,
        notes: &str,
    ) {
        tracing::info!(
            "[{:7.1}s] {:5.1}%  {:.2}V  {:+.0}mA  {:.1}W  load={level}%",
            elapsed.as_secs_f64(),
            sample.battery_pct,
            sample.voltage_v,
            sample.current_ma,
            sample.power_w,
        );

        let Some(recorder) = &mut self.recorder else {
            return;
        };
        let ctx = RowContext {
            timestamp: Local::now(),
            elapsed,
            target_load: level,
            workers,
            notes,
        };
        if let Err(e) = recorder.write_sample(sample, &ctx) {
            tracing::error!(error = %e, "Failed to write CSV row, disabling CSV output");
            self.recorder = None;
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    samples: usize,
    start_pct: Option<f64>,
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use gambit_core::error::SensorError;

    use super::*;
    use crate::pool::testing::FakeLauncher;

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

    fn at_percent(percent: f64) -> Result<PowerReading, SensorError> {
        Ok(PowerReading {
            bus_voltage_v: 3.0 * (3.0 + 1.2 * percent / 100.0),
            shunt_voltage_v: 0.0,
            current_ma: -1000.0,
        })
    }

    fn settings() -> RunSettings {
        RunSettings {
            profile: Profile::Stress,
            threshold: 10.0,
            interval: Duration::from_secs(1),
            cycle_duration: Duration::from_secs(60),
            cell_count: 3,
            record_dir: None,
        }
    }

    fn runner(script: Vec<Result<PowerReading, SensorError>>) -> Runner<Scripted, FakeLauncher> {
        Runner::new(
            settings(),
            Scripted(script.into()),
            WorkerPool::new(FakeLauncher::default(), 2),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn threshold_at_or_above_battery_fails_fast() {
        let result = runner(vec![at_percent(8.0)]).run().await;
        assert_matches!(
            result,
            Err(RunError::ThresholdNotBelowBattery { threshold, .. }) if threshold == 10.0
        );
    }

    #[tokio::test]
    async fn missing_initial_reading_fails_fast() {
        assert_matches!(runner(vec![]).run().await, Err(RunError::InitialRead));
    }

    #[test]
    fn threshold_error_message_names_both_values() {
        let e = RunError::ThresholdNotBelowBattery {
            threshold: 10.0,
            current: 8.333,
        };
        assert_eq!(e.to_string(), "Threshold (10%) >= current battery (8.3%)");
    }
}

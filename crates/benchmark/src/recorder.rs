//! Per-run CSV record of every sample.
//!
//! One file per run, opened at start and flushed after every row, so a crash
//! or power loss costs at most the row being written.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::profile::Profile;
use crate::sampler::Sample;

pub const HEADER: [&str; 10] = [
    "timestamp",
    "elapsed_s",
    "voltage_v",
    "current_ma",
    "power_w",
    "battery_pct",
    "target_load_pct",
    "workers",
    "charging",
    "notes",
];

/// Note attached to the first sample of a run.
pub const START_NOTE: &str = "test_start";

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: csv::Error },
}

/// `benchmark_<profile>_<YYYYmmdd_HHMMSS>.csv`
pub fn record_file_name(profile: Profile, started: DateTime<Local>) -> String {
    format!("benchmark_{profile}_{}.csv", started.format("%Y%m%d_%H%M%S"))
}

/// Everything in one row besides the sample itself.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub timestamp: DateTime<Local>,
    pub elapsed: Duration,
    pub target_load: u8,
    pub workers: usize,
    pub notes: &'a str,
}

/// Render one row in header order.
pub fn row_fields(sample: &Sample, ctx: &RowContext<'_>) -> [String; 10] {
    [
        ctx.timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        format!("{:.1}", ctx.elapsed.as_secs_f64()),
        format!("{:.2}", sample.voltage_v),
        format!("{:.0}", sample.current_ma),
        format!("{:.2}", sample.power_w),
        format!("{:.1}", sample.battery_pct),
        ctx.target_load.to_string(),
        ctx.workers.to_string(),
        sample.charging.to_string(),
        ctx.notes.to_string(),
    ]
}

pub struct Recorder {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl Recorder {
    /// Create `dir` if needed and start a new record file with its header.
    pub fn create(
        dir: &Path,
        profile: Profile,
        started: DateTime<Local>,
    ) -> Result<Self, RecordError> {
        std::fs::create_dir_all(dir).map_err(|source| RecordError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(record_file_name(profile, started));
        let writer = csv::Writer::from_path(&path).map_err(|source| RecordError::Write {
            path: path.clone(),
            source,
        })?;

        let mut recorder = Self { writer, path };
        recorder.write_record(HEADER)?;
        tracing::info!("CSV output: {}", recorder.path.display());
        Ok(recorder)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_sample(
        &mut self,
        sample: &Sample,
        ctx: &RowContext<'_>,
    ) -> Result<(), RecordError> {
        self.write_record(row_fields(sample, ctx))
    }

    fn write_record<I, T>(&mut self, record: I) -> Result<(), RecordError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(record)
            .and_then(|()| self.writer.flush().map_err(csv::Error::from))
            .map_err(|source| RecordError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

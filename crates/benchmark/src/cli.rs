//! Command-line interface of `ups-benchmark`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gambit_core::battery::{DEFAULT_CELL_COUNT, MAX_CELL_COUNT};
use gambit_core::config::parse_cli_address;

use crate::profile::Profile;
use crate::runner::RunSettings;

/// Default INA219 address on the UPS board.
pub const DEFAULT_I2C_ADDRESS: &str = "0x41";

const EXAMPLES: &str = "\
Examples:
  # Stress mode - 100% CPU until threshold or Ctrl+C
  ups-benchmark stress --threshold 10 --output ./results/

  # Cyclic mode - rotate through load levels
  ups-benchmark cyclic --cycle-duration 60 --threshold 10";

/// Benchmark UPS/battery runtime under CPU load.
#[derive(Debug, Parser)]
#[command(name = "ups-benchmark", version, after_help = EXAMPLES)]
pub struct Args {
    /// Test profile: 'stress' (100% CPU) or 'cyclic' (rotating loads)
    #[arg(value_enum, required_unless_present = "burn_worker")]
    pub profile: Option<Profile>,

    /// Stop at this battery %
    #[arg(long, default_value = "10", value_name = "PCT", value_parser = parse_percent)]
    pub threshold: f64,

    /// Sample interval in seconds
    #[arg(long, default_value = "1.0", value_name = "SEC", value_parser = parse_seconds)]
    pub interval: Duration,

    /// CSV output directory
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub output: PathBuf,

    /// Seconds per load level in cyclic mode
    #[arg(long, default_value = "60", value_name = "SEC", value_parser = parse_seconds)]
    pub cycle_duration: Duration,

    /// Battery cell count
    #[arg(
        long,
        default_value_t = DEFAULT_CELL_COUNT,
        value_name = "N",
        value_parser = clap::value_parser!(u8).range(1..=i64::from(MAX_CELL_COUNT)),
    )]
    pub cells: u8,

    /// INA219 I2C address (hex with 0x prefix, or decimal)
    #[arg(long, default_value = DEFAULT_I2C_ADDRESS, value_name = "ADDR", value_parser = parse_cli_address)]
    pub i2c_address: u8,

    /// Only look for the INA219 on this I2C bus
    #[arg(long, value_name = "BUS")]
    pub i2c_bus: Option<u8>,

    /// Console only, no CSV output
    #[arg(long)]
    pub no_csv: bool,

    /// Run as a CPU burn worker (spawned by the benchmark itself)
    #[arg(long, hide = true, conflicts_with = "profile")]
    pub burn_worker: bool,
}

impl Args {
    /// Benchmark settings, or `None` in burn-worker mode.
    pub fn run_settings(&self) -> Option<RunSettings> {
        let profile = self.profile?;
        Some(RunSettings {
            profile,
            threshold: self.threshold,
            interval: self.interval,
            cycle_duration: self.cycle_duration,
            cell_count: self.cells,
            record_dir: (!self.no_csv).then(|| self.output.clone()),
        })
    }
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("must be greater than 0 (got {s})"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn parse_percent(s: &str) -> Result<f64, String> {
    let pct: f64 = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !(0.0..=100.0).contains(&pct) {
        return Err(format!("must be between 0 and 100 (got {s})"));
    }
    Ok(pct)
}

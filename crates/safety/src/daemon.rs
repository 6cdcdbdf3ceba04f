//! Process bootstrap shared by the monitor binaries.
//!
//! Loads the sensor's config section, binds the sensor and hands both to a
//! [`Monitor`]. Every path out of [`run`] is a failure from the service
//! manager's point of view: either startup failed or the monitor has
//! already requested shutdown.

use std::path::Path;
use std::process::ExitCode;

use gambit_core::config::{resolve_config_path, MonitorConfig, SensorKind, SensorSettings};
use gambit_core::error::SensorError;
use gambit_core::sensor::Sensor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::monitor::{Monitor, ReadingLog};
use crate::shutdown::SystemShutdown;

/// Install the fmt subscriber, honouring `RUST_LOG` when set.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the monitor for `kind` until it requests shutdown.
///
/// `open` binds the sensor from the loaded config.
pub async fn run<S, F>(kind: SensorKind, open: F) -> ExitCode
where
    S: Sensor,
    S::Reading: ReadingLog,
    F: FnOnce(&MonitorConfig) -> Result<S, SensorError>,
{
    let path = resolve_config_path();
    let config = match MonitorConfig::load(kind, &path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    log_startup(&config, &path);

    let sensor = match open(&config) {
        Ok(sensor) => sensor,
        Err(e) => {
            tracing::error!(sensor = %kind, error = %e, "Failed to initialize sensor");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        "{} sensor initialized at 0x{:02X}",
        kind.label(),
        config.i2c_address
    );

    let monitor = match Monitor::new(sensor, config, SystemShutdown::default()) {
        Ok(monitor) => monitor,
        Err(e) => {
            tracing::error!(error = %e, "Invalid monitor configuration");
            return ExitCode::FAILURE;
        }
    };

    monitor.run().await;
    ExitCode::FAILURE
}

fn log_startup(config: &MonitorConfig, path: &Path) {
    let unit = config.kind.unit();
    tracing::info!(
        config = %path.display(),
        "Starting {} safety monitor",
        config.kind.label()
    );
    tracing::info!(
        address = format_args!("0x{:02X}", config.i2c_address),
        bus = ?config.i2c_bus,
        warning = format_args!("{}{unit}", config.warning_threshold),
        shutdown = format_args!("{}{unit}", config.shutdown_threshold),
        poll_secs = config.poll_interval.as_secs_f64(),
        "Monitor settings",
    );

    match &config.settings {
        SensorSettings::Temperature => {}
        SensorSettings::Thermocouple { thermocouple_type } => {
            tracing::info!(thermocouple_type = thermocouple_type.as_str(), "Thermocouple type");
        }
        SensorSettings::Battery { cell_count } => {
            tracing::info!(cell_count, "Battery pack: {cell_count}S Li-ion");
        }
    }
}

/// Open a sensor with the bus and address from `config` against the live sysfs.
pub fn open_with<S>(
    config: &MonitorConfig,
    open: impl FnOnce(&Path, Option<u8>, u8) -> Result<S, SensorError>,
) -> Result<S, SensorError> {
    open(
        Path::new(gambit_sensors::sysfs::DEFAULT_SYSFS_ROOT),
        config.i2c_bus,
        config.i2c_address,
    )
}

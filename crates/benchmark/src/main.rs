//! `ups-benchmark` -- UPS battery runtime under CPU load.
//!
//! Loads the CPU with burn workers while sampling the INA219, logging each
//! sample and recording it to CSV, until the battery has discharged to the
//! threshold or the run is interrupted with SIGINT/SIGTERM.
//!
//! The same executable also serves as the burn worker when started with the
//! hidden `--burn-worker` flag.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use gambit_benchmark::burn;
use gambit_benchmark::cli::Args;
use gambit_benchmark::pool::{available_cores, ProcessLauncher, WorkerPool};
use gambit_benchmark::runner::{shutdown_signal, RunSettings, Runner};
use gambit_sensors::sysfs::DEFAULT_SYSFS_ROOT;
use gambit_sensors::Ina219;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let args = Args::parse();
    if args.burn_worker {
        return burn::run_worker();
    }

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gambit_benchmark=info,ups_benchmark=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(settings) = args.run_settings() else {
        tracing::error!("A profile is required");
        return ExitCode::FAILURE;
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args, settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, settings: RunSettings) -> anyhow::Result<()> {
    let sensor = Ina219::open(Path::new(DEFAULT_SYSFS_ROOT), args.i2c_bus, args.i2c_address)
        .context("Failed to initialize sensor")?;
    tracing::info!("INA219 sensor initialized at 0x{:02X}", args.i2c_address);

    let launcher =
        ProcessLauncher::current_exe().context("Failed to locate the benchmark executable")?;
    let pool = WorkerPool::new(launcher, available_cores());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    Runner::new(settings, sensor, pool, cancel).run().await?;
    Ok(())
}

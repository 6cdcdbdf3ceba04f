//! `pct2075-safety`: board temperature monitor. Powers the host off when the
//! PCT2075 reads at or above the configured shutdown temperature.

use std::process::ExitCode;

use gambit_core::config::SensorKind;
use gambit_safety::daemon;
use gambit_sensors::Pct2075;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    daemon::init_tracing("gambit_safety=info,gambit_sensors=info,pct2075_safety=info");

    daemon::run(SensorKind::Pct2075, |config| daemon::open_with(config, Pct2075::open)).await
}

//! `ina219-safety`: UPS battery monitor. Shuts the host down when the pack
//! drops to the shutdown percentage while discharging.

use std::process::ExitCode;

use gambit_core::config::SensorKind;
use gambit_safety::daemon;
use gambit_sensors::Ina219;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    daemon::init_tracing("gambit_safety=info,gambit_sensors=info,ina219_safety=info");

    daemon::run(SensorKind::Ina219, |config| daemon::open_with(config, Ina219::open)).await
}

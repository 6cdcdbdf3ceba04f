//! `mcp9601-safety`: thermocouple monitor. Acts on the hot-junction
//! temperature only; the amplifier's ambient reading is logged for context.

use std::process::ExitCode;

use gambit_core::config::SensorKind;
use gambit_safety::daemon;
use gambit_sensors::Mcp9601;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    daemon::init_tracing("gambit_safety=info,gambit_sensors=info,mcp9601_safety=info");

    daemon::run(SensorKind::Mcp9601, |config| {
        let expected = config.thermocouple_type().unwrap_or_default();
        daemon::open_with(config, |root, bus, address| {
            Mcp9601::open(root, bus, address, expected)
        })
    })
    .await
}

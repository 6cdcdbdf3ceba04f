//! UPS battery runtime benchmark.
//!
//! Loads the CPU with burn workers (all cores, or a rotating ladder of load
//! levels) while sampling the INA219, and stops once the battery has
//! discharged to a threshold or the process is interrupted.

pub mod burn;
pub mod cli;
pub mod pool;
pub mod profile;
pub mod recorder;
pub mod runner;
pub mod sampler;

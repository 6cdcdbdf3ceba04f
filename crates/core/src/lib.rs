//! Shared domain logic for the hardware safety monitors and the UPS
//! benchmark.
//!
//! Everything here is pure: configuration parsing, battery math, threshold
//! evaluation and the sensor capability interface. Hardware access and
//! process control live in the downstream crates.

pub mod battery;
pub mod config;
pub mod error;
pub mod monitor;
pub mod sensor;
pub mod thresholds;

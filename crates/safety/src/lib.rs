//! Hardware safety monitors for the Gambit payload computer.
//!
//! Each monitor binary polls one sensor and powers the host off when a
//! shutdown threshold is crossed. The shared pieces live here so the three
//! binaries stay thin.

pub mod daemon;
pub mod monitor;
pub mod shutdown;

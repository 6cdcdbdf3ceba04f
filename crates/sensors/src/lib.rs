//! Hardware access for the safety monitors and the UPS benchmark.
//!
//! The I2C register protocols are handled by the kernel's own drivers
//! (`lm75`, `ina2xx`, `mcp9600`); this crate only locates the bound device
//! by bus and address and reads the values it publishes in sysfs. Each
//! driver implements [`gambit_core::sensor::Sensor`].

pub mod ina219;
pub mod mcp9601;
pub mod pct2075;
pub mod sysfs;

pub use ina219::Ina219;
pub use mcp9601::Mcp9601;
pub use pct2075::Pct2075;

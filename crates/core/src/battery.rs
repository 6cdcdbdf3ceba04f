//! Lithium-ion pack state-of-charge estimation.
//!
//! Shared by the INA219 safety monitor and the UPS benchmark so both agree
//! on what "10%" means.

/// Per-cell voltage treated as 100%.
pub const CELL_VOLTAGE_FULL: f64 = 4.2;

/// Per-cell voltage treated as 0%.
pub const CELL_VOLTAGE_EMPTY: f64 = 3.0;

/// Default pack configuration (3S).
pub const DEFAULT_CELL_COUNT: u8 = 3;

/// The INA219 bus input tops out at 26V; a 6S pack peaks at 25.2V.
pub const MAX_CELL_COUNT: u8 = 6;

/// Estimate the charge of a `cell_count`-series pack at terminal `voltage`.
///
/// Linear between [`CELL_VOLTAGE_EMPTY`] and [`CELL_VOLTAGE_FULL`] per cell,
/// clamped to `0.0..=100.0`. The interpolation is done per cell so the
/// endpoints land exactly on 0 and 100.
pub fn battery_percent(voltage: f64, cell_count: u8) -> f64 {
    let cells = f64::from(cell_count.max(1));
    let per_cell = voltage / cells;

    if per_cell >= CELL_VOLTAGE_FULL {
        return 100.0;
    }
    if per_cell <= CELL_VOLTAGE_EMPTY {
        return 0.0;
    }

    let percent = (per_cell - CELL_VOLTAGE_EMPTY) / (CELL_VOLTAGE_FULL - CELL_VOLTAGE_EMPTY) * 100.0;
    percent.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_battery_3s() {
        assert_eq!(battery_percent(12.6, 3), 100.0);
    }

    #[test]
    fn empty_battery_3s() {
        assert_eq!(battery_percent(9.0, 3), 0.0);
    }

    #[test]
    fn half_battery_3s() {
        assert!((battery_percent(10.8, 3) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_above_full() {
        assert_eq!(battery_percent(13.0, 3), 100.0);
    }

    #[test]
    fn clamps_below_empty() {
        assert_eq!(battery_percent(8.0, 3), 0.0);
    }

    #[test]
    fn endpoints_for_every_supported_cell_count() {
        for cells in 1..=MAX_CELL_COUNT {
            let c = f64::from(cells);
            assert_eq!(battery_percent(CELL_VOLTAGE_EMPTY * c, cells), 0.0, "{cells}S empty");
            assert_eq!(battery_percent(CELL_VOLTAGE_FULL * c, cells), 100.0, "{cells}S full");
            let mid = (CELL_VOLTAGE_EMPTY + CELL_VOLTAGE_FULL) / 2.0 * c;
            assert!((battery_percent(mid, cells) - 50.0).abs() < 1e-6, "{cells}S mid");
        }
    }

    #[test]
    fn non_decreasing_in_voltage() {
        for cells in 1..=MAX_CELL_COUNT {
            let mut previous = f64::MIN;
            let mut voltage = 0.0;
            while voltage < 30.0 {
                let percent = battery_percent(voltage, cells);
                assert!(percent >= previous, "{cells}S dipped at {voltage}V");
                assert!((0.0..=100.0).contains(&percent));
                previous = percent;
                voltage += 0.01;
            }
        }
    }

    #[test]
    fn max_pack_stays_under_ina219_bus_limit() {
        assert!(CELL_VOLTAGE_FULL * f64::from(MAX_CELL_COUNT) <= 26.0);
    }
}

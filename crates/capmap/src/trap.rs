//! Trap (daughter-unit) capacity map.
//!
//! Each tier total is the sum of three independently resolved substances:
//!
//! | substance | primary                 | secondary                |
//! |-----------|-------------------------|--------------------------|
//! | aquifer   | `EST_STORECAP_x`        | `STORE_CAP_x`            |
//! | oil       | `x_EST_STORE_CAP_OIL`   | `x_CALC_STORE_CAP_OIL`   |
//! | gas       | `x_EST_STORE_CAP_GAS`   | `x_CALC_STORE_CAP_GAS`   |
//!
//! where `x` is `MIN`, `MEAN` or `MAX`. The cross-tier fill runs on the totals
//! only; components are floored to zero afterwards.

use std::path::Path;

use log::info;

use crate::cell::Cell;
use crate::error::Result;
use crate::fallback::{cascade, resolve, sum_present, Scenario, Substance, Tiers};
use crate::features::{GeoTable, KeyedColumns};
use crate::table::{Table, TableSource};
use crate::units::{self, UNIT_ID};

/// Trap id column of the trap capacity tables.
pub const TRAP_ID: &str = "TRAP_ID";

/// File name of the trap map written next to the other intermediates.
pub const TRAP_MAP_FILE: &str = "trap_map_lite.geojson";

/// Totals (optimistic first), then components tier by tier.
pub fn trap_columns() -> Vec<String> {
    let tiers = [Scenario::Optimistic, Scenario::Neutral, Scenario::Conservative];
    let mut columns: Vec<String> = tiers.iter().map(|s| s.column()).collect();
    for s in tiers {
        columns.extend(Substance::ALL.iter().map(|&m| s.component_column(m)));
    }
    columns
}

fn source_columns(s: Scenario, m: Substance) -> (String, String) {
    let x = s.stat();
    match m {
        Substance::Aquifer => (format!("EST_STORECAP_{x}"), format!("STORE_CAP_{x}")),
        Substance::Oil => (format!("{x}_EST_STORE_CAP_OIL"), format!("{x}_CALC_STORE_CAP_OIL")),
        Substance::Gas => (format!("{x}_EST_STORE_CAP_GAS"), format!("{x}_CALC_STORE_CAP_GAS")),
    }
}

/// One trap's resolved estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapEstimate {
    pub totals: Tiers<f64>,
    /// `[aquifer, oil, gas]` per tier, floored to zero.
    pub components: Tiers<[f64; 3]>,
}

impl TrapEstimate {
    /// Cells in [`trap_columns`] order.
    fn cells(&self) -> Vec<Cell> {
        let tiers = [Scenario::Optimistic, Scenario::Neutral, Scenario::Conservative];
        let mut out: Vec<Cell> = tiers
            .iter()
            .map(|&s| Cell::Float(*self.totals.get(s)))
            .collect();
        for s in tiers {
            out.extend(self.components.get(s).iter().map(|&v| Cell::Float(v)));
        }
        out
    }
}

/// Resolve one trap from its raw component inputs, indexed `[aquifer, oil, gas]`
/// with `(primary, secondary)` pairs per tier.
pub fn estimate_trap(inputs: &Tiers<[(Option<f64>, Option<f64>); 3]>) -> TrapEstimate {
    let resolved: Tiers<[Option<f64>; 3]> =
        inputs.map(|pairs| pairs.map(|(primary, secondary)| resolve(primary, secondary)));

    let totals = cascade(resolved.map(|parts| Some(sum_present(parts))));
    let components = resolved.map(|parts| parts.map(|v| v.unwrap_or(0.0)));

    TrapEstimate { totals, components }
}

pub fn trap_capacity(table: &Table) -> Result<KeyedColumns> {
    let keys = table.require(TRAP_ID)?;

    let columns: Tiers<[(Vec<Option<f64>>, Vec<Option<f64>>); 3]> = Tiers::from_fn(|s| {
        Substance::ALL.map(|m| {
            let (primary, secondary) = source_columns(s, m);
            (table.numbers(&primary), table.numbers(&secondary))
        })
    });

    let rows = keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            let inputs = columns.map(|pairs| pairs.each_ref().map(|(p, q)| (p[i], q[i])));
            (key, estimate_trap(&inputs).cells())
        })
        .collect();

    Ok(KeyedColumns {
        columns: trap_columns(),
        rows,
    })
}

/// Build the trap map and write it to `out_dir`/[`TRAP_MAP_FILE`].
pub fn build_trap_map(tables: &TableSource, map_path: &Path, out_dir: &Path) -> Result<GeoTable> {
    let table = tables.load()?;

    let units = units::load_units(map_path)?;

    let capacity = trap_capacity(&table)?;
    info!(
        "Derived tier estimates for {} trap records",
        capacity.rows.len()
    );

    let map = units.left_join(UNIT_ID, &capacity)?;

    let out = out_dir.join(TRAP_MAP_FILE);
    map.write_geojson(&out)?;
    info!("Trap map: {} features -> {}", map.len(), out.display());

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(
        aquifer: (Option<f64>, Option<f64>),
        oil: (Option<f64>, Option<f64>),
        gas: (Option<f64>, Option<f64>),
    ) -> [(Option<f64>, Option<f64>); 3] {
        [aquifer, oil, gas]
    }

    #[test]
    fn totals_are_sums_of_resolved_components() {
        let inputs = Tiers {
            conservative: pairs((Some(0.0), Some(4.0)), (Some(1.0), Some(9.0)), (None, Some(2.0))),
            neutral: pairs((Some(5.0), None), (None, None), (Some(0.0), None)),
            optimistic: pairs((None, None), (None, Some(3.0)), (Some(6.0), Some(1.0))),
        };

        let e = estimate_trap(&inputs);
        assert_eq!(e.components.conservative, [4.0, 1.0, 2.0]);
        assert_eq!(e.totals.conservative, 7.0);
        assert_eq!(e.components.neutral, [5.0, 0.0, 0.0]);
        assert_eq!(e.totals.neutral, 5.0);
        assert_eq!(e.totals.optimistic, 9.0);

        for s in Scenario::ALL {
            let sum: f64 = e.components.get(s).iter().sum();
            assert_eq!(*e.totals.get(s), sum);
        }
    }

    #[test]
    fn cross_fill_applies_to_totals_not_components() {
        let nothing = pairs((None, None), (None, None), (None, None));
        let inputs = Tiers {
            conservative: pairs((Some(2.0), None), (None, Some(1.0)), (None, None)),
            neutral: nothing,
            optimistic: nothing,
        };

        let e = estimate_trap(&inputs);
        assert_eq!(e.totals, Tiers { conservative: 3.0, neutral: 3.0, optimistic: 3.0 });
        assert_eq!(e.components.neutral, [0.0, 0.0, 0.0]);
        assert_eq!(e.components.optimistic, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn capacity_rows_follow_column_layout() {
        let table = Table {
            origin: "traps.csv".into(),
            columns: vec![
                "TRAP_ID".into(),
                "EST_STORECAP_MIN".into(),
                "MIN_EST_STORE_CAP_OIL".into(),
                "MIN_CALC_STORE_CAP_GAS".into(),
                "MEAN_CALC_STORE_CAP_OIL".into(),
            ],
            rows: vec![vec![
                Cell::Text("T1".into()),
                Cell::Float(1.5),
                Cell::Int(2),
                Cell::Int(3),
                Cell::Int(0),
            ]],
        };

        let k = trap_capacity(&table).unwrap();
        assert_eq!(k.columns.len(), 12);
        assert_eq!(k.columns[0], "optimistic estimate Mt");
        assert_eq!(k.columns[11], "conservative estimate GAS Mt");

        let (key, cells) = &k.rows[0];
        assert_eq!(key, &Cell::Text("T1".into()));
        let get = |name: &str| {
            let i = k.columns.iter().position(|c| c == name).unwrap();
            cells[i].as_f64().unwrap()
        };
        assert_eq!(get("conservative estimate Mt"), 6.5);
        assert_eq!(get("conservative estimate OIL Mt"), 2.0);
        assert_eq!(get("neutral estimate Mt"), 6.5);
        assert_eq!(get("optimistic estimate Mt"), 6.5);
        assert_eq!(get("neutral estimate OIL Mt"), 0.0);
    }
}

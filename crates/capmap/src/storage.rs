//! Storage-unit capacity map.

use std::path::Path;

use log::info;

use crate::cell::Cell;
use crate::error::Result;
use crate::fallback::{add_strict, cascade, resolve, Scenario, Tiers};
use crate::features::{GeoTable, KeyedColumns};
use crate::table::Table;
use crate::units::{self, UNIT_ID};

/// Unit id column of the storage capacity table.
pub const STORAGE_UNIT_ID: &str = "STORAGE_UNIT_ID";

/// HC-daughter capacity, added to every tier without fallback.
pub const HC_DAUGHTER: &str = "STORE_CAP_HCDAUGHTER";

/// File name of the storage map written next to the other intermediates.
pub const STORAGE_MAP_FILE: &str = "storage_unit_map_lite.geojson";

/// Output capacity columns, in order.
pub fn storage_columns() -> Vec<String> {
    Scenario::ALL.iter().map(|s| s.column()).collect()
}

/// Per-unit tier totals: `resolve(EST_STORECAP_x, STORE_CAP_x) + STORE_CAP_HCDAUGHTER`,
/// then the cross-tier fill.
pub fn storage_capacity(table: &Table) -> Result<KeyedColumns> {
    let keys = table.require(STORAGE_UNIT_ID)?;

    let estimated = Tiers::from_fn(|s| table.numbers(&format!("EST_STORECAP_{}", s.stat())));
    let stored = Tiers::from_fn(|s| table.numbers(&format!("STORE_CAP_{}", s.stat())));
    let daughter = table.numbers(HC_DAUGHTER);

    let rows = keys
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            let raw = Tiers::from_fn(|s| {
                add_strict(resolve(estimated.get(s)[i], stored.get(s)[i]), daughter[i])
            });
            let t = cascade(raw);
            let values = Scenario::ALL
                .iter()
                .map(|&s| Cell::Float(*t.get(s)))
                .collect();
            (key, values)
        })
        .collect();

    Ok(KeyedColumns {
        columns: storage_columns(),
        rows,
    })
}

/// Build the storage-unit map and write it to `out_dir`/[`STORAGE_MAP_FILE`].
pub fn build_storage_map(table_path: &Path, map_path: &Path, out_dir: &Path) -> Result<GeoTable> {
    let units = units::load_units(map_path)?;

    let table = Table::read_csv(table_path)?;
    let capacity = storage_capacity(&table)?;
    info!(
        "{}: derived tier estimates for {} storage units",
        table_path.display(),
        capacity.rows.len()
    );

    let map = units.left_join(UNIT_ID, &capacity)?;

    let out = out_dir.join(STORAGE_MAP_FILE);
    map.write_geojson(&out)?;
    info!("Storage map: {} features -> {}", map.len(), out.display());

    Ok(map)
}

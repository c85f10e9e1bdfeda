use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};

use crate::cell::Cell;
use crate::error::Result;
use crate::features::{GeoRow, GeoTable, EPSG_4326};
use crate::geometry::{self, Shape};

/// Columns kept from a boundary file, in output order.
pub const UNIT_COLUMNS: [&str; 3] = ["COUNTRY", "COUNTRYCOD", "ID"];

/// Join column on the boundary side.
pub const UNIT_ID: &str = "ID";

/// Grouping key; ordered like the group keys of a sorted group-by.
#[derive(Debug, Clone)]
struct GroupKey(Vec<Cell>);

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| a.sort_cmp(b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

/// Load a boundary file, keep the unit columns and dissolve it to one feature per unit.
pub fn load_units<P: AsRef<Path>>(path: P) -> Result<GeoTable> {
    let path = path.as_ref();
    let raw = GeoTable::read_geojson(path)?;
    let raw_len = raw.len();

    let units = dissolve(raw.select(&UNIT_COLUMNS)?)?;

    info!(
        "{}: {} boundary features dissolved into {} units",
        path.display(),
        raw_len,
        units.len()
    );
    Ok(units)
}

/// Group rows by every property column and union the geometries of each group.
///
/// Rows with a missing key cell are dropped. Groups come out in ascending key
/// order. The result is tagged EPSG:4326.
pub fn dissolve(table: GeoTable) -> Result<GeoTable> {
    let mut groups: BTreeMap<GroupKey, Vec<Shape>> = BTreeMap::new();
    let mut dropped = 0usize;

    for row in table.rows {
        if row.cells.iter().any(Cell::is_missing) {
            dropped += 1;
            continue;
        }

        let shapes = groups.entry(GroupKey(row.cells)).or_default();
        if let Some(g) = row.geometry {
            shapes.push(g);
        }
    }

    if dropped > 0 {
        debug!(
            "{}: dropped {} feature(s) with an incomplete unit key",
            table.origin.display(),
            dropped
        );
    }

    let rows = groups
        .into_iter()
        .map(|(key, shapes)| -> Result<GeoRow> {
            Ok(GeoRow {
                cells: key.0,
                geometry: geometry::union_all(shapes)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GeoTable {
        origin: table.origin,
        crs: EPSG_4326.to_owned(),
        columns: table.columns,
        rows,
    })
}

use indexmap::IndexSet;
use log::debug;

use crate::cell::Cell;
use crate::error::Result;
use crate::features::{GeoTable, EPSG_4326};
use crate::geometry;

/// Merge the storage map and the trap map into one table.
///
/// The result has the union of both column sets (storage columns first); a
/// column one side lacks is zero-filled for that side's rows. Every geometry is
/// reduced to two dimensions. Storage rows precede trap rows. Polygon repair is
/// left to the caller, see [`repair_polygons`].
pub fn combine(mut storage: GeoTable, mut trap: GeoTable) -> Result<GeoTable> {
    let union: IndexSet<String> = storage
        .columns
        .iter()
        .chain(trap.columns.iter())
        .cloned()
        .collect();
    let order: Vec<String> = union.into_iter().collect();

    for table in [&mut storage, &mut trap] {
        for column in &order {
            if !table.has_column(column) {
                debug!("{}: zero-filling absent column `{}`", table.origin.display(), column);
                table.add_column(column, Cell::Int(0));
            }
        }
        table.reorder(&order);

        for row in &mut table.rows {
            if let Some(g) = row.geometry.as_ref() {
                row.geometry = Some(geometry::drop_z(g)?);
            }
        }
    }

    let mut combined = GeoTable::new(EPSG_4326, order);
    combined.rows.reserve(storage.len() + trap.len());
    combined.rows.extend(storage.rows);
    combined.rows.extend(trap.rows);

    Ok(combined)
}

/// Apply the zero-distance-buffer repair to every geometry of `table`.
pub fn repair_polygons(table: &mut GeoTable) {
    for row in &mut table.rows {
        if let Some(g) = row.geometry.as_ref() {
            row.geometry = Some(geometry::repair(g));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::features::GeoRow;
    use crate::geometry::Shape;
    use serde_json::json;
    use smallvec::smallvec;

    fn one_row(column: &str, value: f64, geometry: Shape) -> GeoTable {
        let mut t = GeoTable::new(EPSG_4326, vec![column.to_owned()]);
        t.rows.push(GeoRow {
            cells: vec![Cell::Float(value)],
            geometry: Some(geometry),
        });
        t
    }

    #[test]
    fn columns_are_unioned_and_zero_filled() {
        let storage = one_row("A", 1.0, Shape::Point(smallvec![0.0, 0.0, 7.0]));
        let trap = one_row("B", 2.0, Shape::Point(smallvec![1.0, 1.0]));

        let combined = combine(storage, trap).unwrap();
        assert_eq!(combined.columns, vec!["A", "B"]);
        assert!(combined.has_column("geometry"));
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.crs, EPSG_4326);

        assert_eq!(combined.rows[0].cells, vec![Cell::Float(1.0), Cell::Int(0)]);
        assert_eq!(combined.rows[1].cells, vec![Cell::Int(0), Cell::Float(2.0)]);
        assert_eq!(
            combined.rows[0].geometry,
            Some(Shape::Point(smallvec![0.0, 0.0]))
        );
    }

    #[test]
    fn shared_columns_line_up() {
        let mut storage = one_row("A", 1.0, Shape::Point(smallvec![0.0, 0.0]));
        storage.add_column("C", Cell::Float(3.0));
        let mut trap = one_row("C", 4.0, Shape::Point(smallvec![0.0, 0.0]));
        trap.add_column("A", Cell::Float(5.0));

        let combined = combine(storage, trap).unwrap();
        assert_eq!(combined.columns, vec!["A", "C"]);
        assert_eq!(combined.rows[1].cells, vec![Cell::Float(5.0), Cell::Float(4.0)]);
    }

    #[test]
    fn unsupported_geometry_aborts() {
        let storage = one_row("A", 1.0, Shape::Point(smallvec![0.0, 0.0]));
        let trap = one_row(
            "B",
            2.0,
            Shape::Other {
                kind: "PolyhedralSurface".into(),
                raw: json!({ "type": "PolyhedralSurface" }),
            },
        );
        assert!(matches!(
            combine(storage, trap),
            Err(Error::UnsupportedGeometry { .. })
        ));
    }
}

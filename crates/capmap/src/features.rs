//! In-memory GeoJSON feature tables.
//!
//! A [`GeoTable`] is a FeatureCollection turned sideways: named property columns
//! plus one geometry per row. Reading keeps every property key seen in any
//! feature; writing emits properties in column order.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::geometry::Shape;

pub const EPSG_4326: &str = "EPSG:4326";

#[derive(Debug, Clone, PartialEq)]
pub struct GeoRow {
    /// One cell per entry in [`GeoTable::columns`].
    pub cells: Vec<Cell>,
    /// `None` for features whose geometry is JSON `null`.
    pub geometry: Option<Shape>,
}

#[derive(Debug, Clone)]
pub struct GeoTable {
    pub origin: PathBuf,
    pub crs: String,
    /// Property column names; the geometry column is implicit.
    pub columns: Vec<String>,
    pub rows: Vec<GeoRow>,
}

/// Capacity values keyed by unit id, ready to be joined onto a [`GeoTable`].
#[derive(Debug, Clone, Default)]
pub struct KeyedColumns {
    pub columns: Vec<String>,
    /// `(key, values)` with one value per column.
    pub rows: Vec<(Cell, Vec<Cell>)>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollectionDoc {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    crs: Option<Value>,
    features: Vec<FeatureDoc>,
}

#[derive(Debug, Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

impl GeoTable {
    pub fn new(crs: impl Into<String>, columns: Vec<String>) -> Self {
        GeoTable {
            origin: PathBuf::new(),
            crs: crs.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<GeoTable> {
        let path = path.as_ref();
        let invalid = |message: String| Error::InvalidGeoJson {
            path: path.to_path_buf(),
            message,
        };

        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let doc: FeatureCollectionDoc =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Json {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(kind) = doc.kind.as_deref() {
            if kind != "FeatureCollection" {
                return Err(invalid(format!("expected a FeatureCollection, got {kind}")));
            }
        }

        let crs = doc
            .crs
            .as_ref()
            .and_then(crs_from_json)
            .unwrap_or_else(|| EPSG_4326.to_owned());

        let mut names: IndexSet<String> = IndexSet::new();
        for feature in &doc.features {
            if let Some(props) = &feature.properties {
                names.extend(props.keys().cloned());
            }
        }
        let columns: Vec<String> = names.into_iter().collect();

        let mut rows = Vec::with_capacity(doc.features.len());
        for (i, feature) in doc.features.iter().enumerate() {
            let cells = columns
                .iter()
                .map(|c| {
                    feature
                        .properties
                        .as_ref()
                        .and_then(|p| p.get(c))
                        .map_or(Cell::Missing, Cell::from_json)
                })
                .collect();

            let geometry = match &feature.geometry {
                None | Some(Value::Null) => None,
                Some(g) => Some(
                    Shape::from_json(g).map_err(|m| invalid(format!("feature {i}: {m}")))?,
                ),
            };

            rows.push(GeoRow { cells, geometry });
        }

        debug!(
            "Loaded {} features ({} property columns) from {}",
            rows.len(),
            columns.len(),
            path.display()
        );

        Ok(GeoTable {
            origin: path.to_path_buf(),
            crs,
            columns,
            rows,
        })
    }

    pub fn write_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let features: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let properties: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(&row.cells)
                    .map(|(c, v)| (c.clone(), v.to_json()))
                    .collect();

                json!({
                    "type": "Feature",
                    "properties": properties,
                    "geometry": row.geometry.as_ref().map_or(Value::Null, Shape::to_json),
                })
            })
            .collect();

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let doc = json!({
            "type": "FeatureCollection",
            "name": name,
            "crs": crs_to_json(&self.crs),
            "features": features,
        });

        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &doc).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|e| Error::io(path, e))?;

        debug!("Wrote {} features to {}", self.rows.len(), path.display());
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        name == "geometry" || self.column_index(name).is_some()
    }

    /// The cells of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let i = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r.cells[i]).collect())
    }

    /// Keep only the named property columns (and the geometry).
    pub fn select(self, names: &[&str]) -> Result<GeoTable> {
        let positions = names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| Error::missing_column(n, &self.origin))
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .into_iter()
            .map(|mut row| GeoRow {
                cells: positions
                    .iter()
                    .map(|&i| std::mem::replace(&mut row.cells[i], Cell::Missing))
                    .collect(),
                geometry: row.geometry,
            })
            .collect();

        Ok(GeoTable {
            origin: self.origin,
            crs: self.crs,
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Add a column holding `fill` for every row. Existing columns are left alone.
    pub fn add_column(&mut self, name: &str, fill: Cell) {
        if self.column_index(name).is_some() {
            return;
        }
        self.columns.push(name.to_owned());
        for row in &mut self.rows {
            row.cells.push(fill.clone());
        }
    }

    /// Reorder property columns to `order`. Every name must already be a column.
    pub fn reorder(&mut self, order: &[String]) {
        let positions: Vec<usize> = order
            .iter()
            .filter_map(|n| self.column_index(n))
            .collect();
        debug_assert_eq!(positions.len(), self.columns.len());

        for row in &mut self.rows {
            let mut old = std::mem::take(&mut row.cells);
            row.cells = positions
                .iter()
                .map(|&i| std::mem::replace(&mut old[i], Cell::Missing))
                .collect();
        }
        self.columns = positions.iter().map(|&i| self.columns[i].clone()).collect();
    }

    /// Left join on `self[key] == right.key`.
    ///
    /// Every row of `self` survives. A row without a match gets missing cells
    /// for the right-hand columns; a row with several matches is repeated once
    /// per match, in right-hand order. The right-hand key is not carried over.
    pub fn left_join(self, key: &str, right: &KeyedColumns) -> Result<GeoTable> {
        let k = self
            .column_index(key)
            .ok_or_else(|| Error::missing_column(key, &self.origin))?;

        let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, (rk, _)) in right.rows.iter().enumerate() {
            if let Some(norm) = rk.join_key() {
                lookup.entry(norm).or_default().push(i);
            }
        }

        let width = right.columns.len();
        let mut unmatched = 0usize;
        let mut rows = Vec::with_capacity(self.rows.len());

        for row in self.rows {
            let hits = row.cells[k]
                .join_key()
                .and_then(|norm| lookup.get(&norm))
                .filter(|v| !v.is_empty());

            match hits {
                Some(hits) => {
                    for &h in hits {
                        let mut cells = row.cells.clone();
                        cells.extend(right.rows[h].1.iter().cloned());
                        rows.push(GeoRow {
                            cells,
                            geometry: row.geometry.clone(),
                        });
                    }
                }
                None => {
                    unmatched += 1;
                    let mut cells = row.cells;
                    cells.extend(std::iter::repeat(Cell::Missing).take(width));
                    rows.push(GeoRow {
                        cells,
                        geometry: row.geometry,
                    });
                }
            }
        }

        if unmatched > 0 {
            warn!(
                "{}: {} unit(s) have no capacity record; their estimates stay empty",
                self.origin.display(),
                unmatched
            );
        }

        let mut columns = self.columns;
        columns.extend(right.columns.iter().cloned());

        Ok(GeoTable {
            origin: self.origin,
            crs: self.crs,
            columns,
            rows,
        })
    }
}

fn crs_from_json(v: &Value) -> Option<String> {
    let name = v.get("properties")?.get("name")?.as_str()?;
    // urn:ogc:def:crs:EPSG::4326 -> EPSG:4326
    if let Some(code) = name.strip_prefix("urn:ogc:def:crs:EPSG::") {
        return Some(format!("EPSG:{code}"));
    }
    if name == "urn:ogc:def:crs:OGC:1.3:CRS84" {
        return Some(EPSG_4326.to_owned());
    }
    Some(name.to_owned())
}

fn crs_to_json(crs: &str) -> Value {
    let name = match crs.strip_prefix("EPSG:") {
        Some(code) => format!("urn:ogc:def:crs:EPSG::{code}"),
        None => crs.to_owned(),
    };
    json!({ "type": "name", "properties": { "name": name } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn point(x: f64, y: f64) -> Option<Shape> {
        Some(Shape::Point(smallvec![x, y]))
    }

    fn units() -> GeoTable {
        let mut t = GeoTable::new(EPSG_4326, vec!["ID".into()]);
        t.rows = vec![
            GeoRow { cells: vec![Cell::Int(1)], geometry: point(0.0, 0.0) },
            GeoRow { cells: vec![Cell::Int(2)], geometry: point(1.0, 1.0) },
        ];
        t
    }

    #[test]
    fn left_join_keeps_unmatched_rows_and_repeats_duplicates() {
        let right = KeyedColumns {
            columns: vec!["cap".into()],
            rows: vec![
                (Cell::Float(2.0), vec![Cell::Float(5.0)]),
                (Cell::Int(2), vec![Cell::Float(6.0)]),
            ],
        };

        let joined = units().left_join("ID", &right).unwrap();
        assert_eq!(joined.columns, vec!["ID", "cap"]);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.rows[0].cells, vec![Cell::Int(1), Cell::Missing]);
        assert_eq!(joined.rows[1].cells, vec![Cell::Int(2), Cell::Float(5.0)]);
        assert_eq!(joined.rows[2].cells, vec![Cell::Int(2), Cell::Float(6.0)]);
        assert_eq!(joined.rows[2].geometry, point(1.0, 1.0));
    }

    #[test]
    fn select_reports_missing_columns() {
        let err = units().select(&["ID", "COUNTRY"]).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { ref column, .. } if column == "COUNTRY"));
    }

    #[test]
    fn reorder_moves_cells_with_their_columns() {
        let mut t = units();
        t.add_column("A", Cell::Int(0));
        t.reorder(&["A".to_string(), "ID".to_string()]);
        assert_eq!(t.columns, vec!["A", "ID"]);
        assert_eq!(t.rows[1].cells, vec![Cell::Int(0), Cell::Int(2)]);
    }

    #[test]
    fn write_then_read_keeps_columns_crs_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.geojson");

        let mut t = units();
        t.add_column("cap", Cell::Missing);
        t.rows[1].geometry = None;
        t.write_geojson(&path).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::4326");
        assert_eq!(raw["features"][0]["properties"]["cap"], Value::Null);
        assert_eq!(raw["features"][1]["geometry"], Value::Null);

        let back = GeoTable::read_geojson(&path).unwrap();
        assert_eq!(back.crs, EPSG_4326);
        assert_eq!(back.columns, vec!["ID", "cap"]);
        assert_eq!(back.rows[0].geometry, point(0.0, 0.0));
        assert_eq!(back.rows[1].geometry, None);
    }

    #[test]
    fn rejects_non_feature_collections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.geojson");
        std::fs::write(&path, r#"{"type":"Feature","features":[]}"#).unwrap();
        assert!(matches!(
            GeoTable::read_geojson(&path),
            Err(Error::InvalidGeoJson { .. })
        ));
    }
}

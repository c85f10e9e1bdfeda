//! Column-oriented access over row-stored CSV tables.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::cell::Cell;
use crate::error::{Error, Result};

/// A CSV capacity table held fully in memory.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Where the rows came from; used in error messages.
    pub origin: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// One capacity table, or several to be concatenated row-wise.
#[derive(Debug, Clone)]
pub enum TableSource {
    Single(PathBuf),
    Many(Vec<PathBuf>),
}

impl From<PathBuf> for TableSource {
    fn from(p: PathBuf) -> Self {
        TableSource::Single(p)
    }
}

impl From<&str> for TableSource {
    fn from(p: &str) -> Self {
        TableSource::Single(PathBuf::from(p))
    }
}

impl From<Vec<PathBuf>> for TableSource {
    fn from(v: Vec<PathBuf>) -> Self {
        TableSource::Many(v)
    }
}

impl TableSource {
    pub fn load(&self) -> Result<Table> {
        match self {
            TableSource::Single(path) => Table::read_csv(path),
            TableSource::Many(paths) if paths.is_empty() => Err(Error::InvalidTableSource),
            TableSource::Many(paths) => {
                let tables = paths
                    .iter()
                    .map(|p| Table::read_csv(p))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Table::concat(tables))
            }
        }
    }
}

impl Table {
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
        let path = path.as_ref();
        let csv_err = |source| Error::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(csv_err)?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            // Short records are padded with missing cells.
            let row = (0..columns.len())
                .map(|i| record.get(i).map_or(Cell::Missing, Cell::parse))
                .collect();
            rows.push(row);
        }

        debug!(
            "Loaded {} rows x {} columns from {}",
            rows.len(),
            columns.len(),
            path.display()
        );

        Ok(Table {
            origin: path.to_path_buf(),
            columns,
            rows,
        })
    }

    /// Row-wise concatenation. The result carries the union of all columns, in
    /// first-seen order; cells a source table lacks are missing.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut index: IndexMap<String, ()> = IndexMap::new();
        for table in &tables {
            for column in &table.columns {
                index.entry(column.clone()).or_insert(());
            }
        }
        let columns: Vec<String> = index.into_keys().collect();

        let origin = tables
            .first()
            .map(|t| t.origin.clone())
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.rows.len()).sum());
        for table in tables {
            let positions: Vec<Option<usize>> = columns
                .iter()
                .map(|c| table.column_index(c))
                .collect();

            for mut row in table.rows {
                let out = positions
                    .iter()
                    .map(|pos| match pos {
                        Some(i) => std::mem::replace(&mut row[*i], Cell::Missing),
                        None => Cell::Missing,
                    })
                    .collect();
                rows.push(out);
            }
        }

        Table {
            origin,
            columns,
            rows,
        }
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

    /// A column that has to be present.
    pub fn require(&self, name: &str) -> Result<Vec<Cell>> {
        let i = self
            .column_index(name)
            .ok_or_else(|| Error::missing_column(name, &self.origin))?;
        Ok(self.rows.iter().map(|r| r[i].clone()).collect())
    }

    /// Numeric view of a value column. An absent column reads as all missing.
    pub fn numbers(&self, name: &str) -> Vec<Option<f64>> {
        match self.column_index(name) {
            Some(i) => self.rows.iter().map(|r| r[i].as_f64()).collect(),
            None => {
                warn!(
                    "{}: column `{}` absent, treating it as missing",
                    self.origin.display(),
                    name
                );
                vec![None; self.rows.len()]
            }
        }
    }
}

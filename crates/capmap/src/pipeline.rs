use std::path::PathBuf;

use log::info;

use crate::combine::{combine, repair_polygons};
use crate::error::Result;
use crate::fallback::Scenario;
use crate::features::GeoTable;
use crate::storage::build_storage_map;
use crate::table::TableSource;
use crate::trap::build_trap_map;

/// Placeholder in [`PipelineConfig::output`] replaced by the planning horizon.
pub const PLANNING_HORIZONS_PLACEHOLDER: &str = "{planning_horizons}";

/// Every path the pipeline touches. Nothing is read from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub storage_table: PathBuf,
    pub storage_map: PathBuf,
    pub trap_tables: TableSource,
    pub trap_map: PathBuf,
    /// Final combined map; may contain `{planning_horizons}`.
    pub output: PathBuf,
    /// Directory receiving the two `*_map_lite.geojson` intermediates.
    pub intermediate_dir: PathBuf,
    pub planning_horizons: String,
}

impl PipelineConfig {
    pub fn output_path(&self) -> PathBuf {
        let raw = self.output.to_string_lossy();
        if raw.contains(PLANNING_HORIZONS_PLACEHOLDER) {
            PathBuf::from(raw.replace(PLANNING_HORIZONS_PLACEHOLDER, &self.planning_horizons))
        } else {
            self.output.clone()
        }
    }
}

/// Run storage mapper, trap mapper, combiner and repair, then write the
/// combined map. Returns the path written.
///
/// The intermediates are written as each mapper finishes and are left in
/// place if a later stage fails.
pub fn run(config: &PipelineConfig) -> Result<PathBuf> {
    let storage = build_storage_map(
        &config.storage_table,
        &config.storage_map,
        &config.intermediate_dir,
    )?;
    log_totals("storage", &storage);

    let trap = build_trap_map(&config.trap_tables, &config.trap_map, &config.intermediate_dir)?;
    log_totals("trap", &trap);

    let mut complete = combine(storage, trap)?;
    repair_polygons(&mut complete);

    let out = config.output_path();
    complete.write_geojson(&out)?;
    info!(
        "Combined map: {} features, {} columns -> {}",
        complete.len(),
        complete.columns.len(),
        out.display()
    );

    Ok(out)
}

fn log_totals(label: &str, map: &GeoTable) {
    for s in Scenario::ALL {
        let column = s.column();
        if let Some(cells) = map.column(&column) {
            let total: f64 = cells.iter().filter_map(|c| c.as_f64()).sum();
            info!("{label} {column}: {total:.1} Mt total");
        }
    }
}

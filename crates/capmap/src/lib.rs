//! capmap: tiered CO2 storage-capacity maps.
//!
//! - Reads storage-unit and trap capacity tables (CSV) and their unit
//!   boundaries (GeoJSON FeatureCollection).
//! - Reconciles the partially populated estimate columns into three tiers:
//!   conservative (MIN), neutral (MEAN), optimistic (MAX), in megatonnes.
//! - Dissolves boundaries to one (multi-)polygon per (COUNTRY, COUNTRYCOD, ID).
//! - Left-joins the tiers onto the boundaries and writes one map per source.
//! - Merges both maps: column union with zero fill, 2D geometry, polygon repair.
//!
//! Fallback rules (zero counts as missing):
//!   storage:  tier = resolve(EST_STORECAP_x, STORE_CAP_x) + STORE_CAP_HCDAUGHTER
//!   trap:     tier = resolve(aquifer) + resolve(oil) + resolve(gas)
//!   both:     neutral <- conservative if missing, then optimistic <- neutral,
//!             anything left missing -> 0
//!
//! Files written (GeoJSON, EPSG:4326):
//!   <intermediate_dir>/storage_unit_map_lite.geojson
//!   <intermediate_dir>/trap_map_lite.geojson
//!   <output>                                   (combined map)

pub mod cell;
pub mod combine;
pub mod error;
pub mod fallback;
pub mod features;
pub mod geometry;
pub mod pipeline;
pub mod storage;
pub mod table;
pub mod trap;
pub mod units;

pub use cell::Cell;
pub use combine::{combine, repair_polygons};
pub use error::{Error, Result};
pub use fallback::{cascade, resolve, Scenario, Substance, Tiers};
pub use features::{GeoRow, GeoTable, KeyedColumns, EPSG_4326};
pub use geometry::{drop_z, Shape};
pub use pipeline::{run, PipelineConfig};
pub use storage::{build_storage_map, STORAGE_MAP_FILE};
pub use table::{Table, TableSource};
pub use trap::{build_trap_map, TRAP_MAP_FILE};

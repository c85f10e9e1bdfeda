use std::path::PathBuf;

use anyhow::{Context, Result};
use capmap::{PipelineConfig, TableSource};
use clap::Parser;
use log::info;

/// Build the combined CO2 storage-capacity map from storage-unit and trap data.
#[derive(Parser, Debug, Clone)]
#[command(name = "co2map", version, about)]
struct Args {
    /// Storage-unit capacity table (CSV).
    #[arg(long, env = "CO2MAP_STO_TABLE", default_value = "data/Hydrocarbon_Storage_Units.csv")]
    sto_table: PathBuf,

    /// Storage-unit boundaries (GeoJSON).
    #[arg(long, env = "CO2MAP_STO_MAP", default_value = "data/StorageUnits_March13.geojson")]
    sto_map: PathBuf,

    /// Trap capacity table(s) (CSV). Repeat the flag to concatenate several tables.
    #[arg(
        long = "traps-table",
        env = "CO2MAP_TRAPS_TABLES",
        value_delimiter = ',',
        default_values = [
            "data/Hydrocarbon_Traps.csv",
            "data/Hydrocarbon_Traps_Temp.csv",
            "data/Hydrocarbon_Traps1.csv",
        ]
    )]
    traps_tables: Vec<PathBuf>,

    /// Trap (daughter-unit) boundaries (GeoJSON).
    #[arg(long, env = "CO2MAP_TRAPS_MAP", default_value = "data/DaughterUnits_March13.geojson")]
    traps_map: PathBuf,

    /// Combined map output path; `{planning_horizons}` is substituted.
    #[arg(
        long,
        env = "CO2MAP_OUTPUT",
        default_value = "data/complete_map_{planning_horizons}_unit_Mt.geojson"
    )]
    output: PathBuf,

    /// Value substituted for `{planning_horizons}` in --output.
    #[arg(long, env = "CO2MAP_PLANNING_HORIZONS", default_value = "2020")]
    planning_horizons: String,

    /// Where storage_unit_map_lite.geojson and trap_map_lite.geojson are written.
    #[arg(long, env = "CO2MAP_INTERMEDIATE_DIR", default_value = ".")]
    intermediate_dir: PathBuf,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        // A single table is read as is; several are concatenated.
        let trap_tables = match <[PathBuf; 1]>::try_from(self.traps_tables) {
            Ok([one]) => TableSource::Single(one),
            Err(many) => TableSource::Many(many),
        };

        PipelineConfig {
            storage_table: self.sto_table,
            storage_map: self.sto_map,
            trap_tables,
            trap_map: self.traps_map,
            output: self.output,
            intermediate_dir: self.intermediate_dir,
            planning_horizons: self.planning_horizons,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    info!("Starting with {:?}", args);

    let config = args.into_config();
    let out = capmap::run(&config).with_context(|| {
        format!(
            "building CO2 storage map from {} and {}",
            config.storage_table.display(),
            config.trap_map.display()
        )
    })?;

    info!("Done: {}", out.display());
    println!("{}", out.display());

    Ok(())
}

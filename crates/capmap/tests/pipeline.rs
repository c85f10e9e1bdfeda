use std::fs;
use std::path::{Path, PathBuf};

use capmap::{
    combine, run, Cell, Error, GeoRow, GeoTable, PipelineConfig, Shape, TableSource,
    EPSG_4326, STORAGE_MAP_FILE, TRAP_MAP_FILE,
};
use serde_json::{json, Value};
use smallvec::smallvec;

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn square(x0: f64, y0: f64, side: f64, z: f64) -> Value {
    json!([[
        [x0, y0, z],
        [x0 + side, y0, z],
        [x0 + side, y0 + side, z],
        [x0, y0 + side, z],
        [x0, y0, z]
    ]])
}

fn feature(country: &str, id: Value, coords: Value) -> Value {
    json!({
        "type": "Feature",
        "properties": { "COUNTRY": country, "COUNTRYCOD": "NO", "ID": id, "EXTRA": "dropped" },
        "geometry": { "type": "Polygon", "coordinates": coords }
    })
}

fn collection(features: Vec<Value>) -> String {
    json!({ "type": "FeatureCollection", "features": features }).to_string()
}

fn props<'a>(doc: &'a Value, i: usize) -> &'a serde_json::Map<String, Value> {
    doc["features"][i]["properties"].as_object().unwrap()
}

fn config(dir: &Path, trap_tables: TableSource) -> PipelineConfig {
    PipelineConfig {
        storage_table: dir.join("storage.csv"),
        storage_map: dir.join("storage.geojson"),
        trap_tables,
        trap_map: dir.join("traps.geojson"),
        output: dir.join("out").join("complete_map_{planning_horizons}_unit_Mt.geojson"),
        intermediate_dir: dir.to_path_buf(),
        planning_horizons: "2020".into(),
    }
}

fn write_storage_inputs(dir: &Path) {
    write(
        dir,
        "storage.csv",
        "STORAGE_UNIT_ID,EST_STORECAP_MIN,STORE_CAP_MIN,STORE_CAP_HCDAUGHTER,EST_STORECAP_MEAN,EST_STORECAP_MAX,STORE_CAP_MAX\n\
         1,0,5,2,10,0,20\n",
    );
    write(
        dir,
        "storage.geojson",
        &collection(vec![
            feature("Norway", json!(1), square(0.0, 0.0, 1.0, 100.0)),
            feature("Norway", json!(1), square(0.5, 0.0, 1.0, 100.0)),
            feature("Norway", json!(9), square(5.0, 5.0, 1.0, 100.0)),
        ]),
    );
}

fn write_trap_inputs(dir: &Path) -> Vec<PathBuf> {
    let a = write(
        dir,
        "traps_a.csv",
        "TRAP_ID,EST_STORECAP_MIN,STORE_CAP_MIN,MIN_EST_STORE_CAP_OIL,MIN_CALC_STORE_CAP_OIL,MIN_EST_STORE_CAP_GAS,MIN_CALC_STORE_CAP_GAS\n\
         100,0,3,1,,0,2\n",
    );
    let b = write(
        dir,
        "traps_b.csv",
        "TRAP_ID,EST_STORECAP_MEAN,MEAN_EST_STORE_CAP_OIL,EST_STORECAP_MAX\n\
         200,4,1,0\n",
    );
    write(
        dir,
        "traps.geojson",
        &collection(vec![
            feature("Norway", json!(100), square(10.0, 10.0, 1.0, 0.0)),
            feature("Norway", json!(200), square(20.0, 20.0, 1.0, 0.0)),
        ]),
    );
    vec![a, b]
}

#[test]
fn storage_fallback_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_storage_inputs(dir.path());
    write_trap_inputs(dir.path());

    let cfg = config(dir.path(), TableSource::Single(dir.path().join("traps_a.csv")));
    let out = run(&cfg).unwrap();

    let storage = read_json(&dir.path().join(STORAGE_MAP_FILE));
    let features = storage["features"].as_array().unwrap();
    // Two raw features with ID 1 dissolve into one.
    assert_eq!(features.len(), 2);

    let unit = props(&storage, 0);
    assert_eq!(unit["ID"], json!(1));
    assert!(!unit.contains_key("EXTRA"));
    assert!(!unit.contains_key("STORAGE_UNIT_ID"));
    assert_eq!(unit["conservative estimate Mt"].as_f64(), Some(7.0));
    assert_eq!(unit["neutral estimate Mt"].as_f64(), Some(12.0));
    assert_eq!(unit["optimistic estimate Mt"].as_f64(), Some(22.0));

    // Geometry-only unit keeps empty estimates until the combined map.
    let orphan = props(&storage, 1);
    assert_eq!(orphan["ID"], json!(9));
    assert_eq!(orphan["neutral estimate Mt"], Value::Null);

    assert_eq!(out, dir.path().join("out").join("complete_map_2020_unit_Mt.geojson"));
    let complete = read_json(&out);
    assert_eq!(
        complete["crs"]["properties"]["name"],
        json!("urn:ogc:def:crs:EPSG::4326")
    );
}

#[test]
fn trap_tables_are_concatenated_and_summed() {
    let dir = tempfile::tempdir().unwrap();
    write_storage_inputs(dir.path());
    let tables = write_trap_inputs(dir.path());

    run(&config(dir.path(), TableSource::Many(tables))).unwrap();

    let traps = read_json(&dir.path().join(TRAP_MAP_FILE));
    assert_eq!(traps["features"].as_array().unwrap().len(), 2);

    let t100 = props(&traps, 0);
    assert_eq!(t100["ID"], json!(100));
    // aquifer 3 (EST 0 -> STORE 3) + oil 1 + gas 2 (EST 0 -> CALC 2)
    assert_eq!(t100["conservative estimate Mt"].as_f64(), Some(6.0));
    assert_eq!(t100["conservative estimate aquifer Mt"].as_f64(), Some(3.0));
    assert_eq!(t100["conservative estimate OIL Mt"].as_f64(), Some(1.0));
    assert_eq!(t100["conservative estimate GAS Mt"].as_f64(), Some(2.0));
    assert_eq!(t100["neutral estimate Mt"].as_f64(), Some(6.0));
    assert_eq!(t100["optimistic estimate Mt"].as_f64(), Some(6.0));
    assert!(!t100.contains_key("TRAP_ID"));

    let t200 = props(&traps, 1);
    assert_eq!(t200["conservative estimate Mt"].as_f64(), Some(0.0));
    assert_eq!(t200["neutral estimate Mt"].as_f64(), Some(5.0));
    assert_eq!(t200["optimistic estimate Mt"].as_f64(), Some(5.0));
    assert_eq!(t200["optimistic estimate aquifer Mt"].as_f64(), Some(0.0));
}

#[test]
fn combined_map_is_two_dimensional_and_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    write_storage_inputs(dir.path());
    let tables = write_trap_inputs(dir.path());

    let out = run(&config(dir.path(), TableSource::Many(tables))).unwrap();
    let complete = read_json(&out);
    let features = complete["features"].as_array().unwrap();
    assert_eq!(features.len(), 4);

    // Storage rows first: trap-only columns are zero there.
    let storage_row = props(&complete, 0);
    assert_eq!(storage_row["conservative estimate OIL Mt"].as_f64(), Some(0.0));
    assert_eq!(storage_row["conservative estimate Mt"].as_f64(), Some(7.0));

    let trap_row = props(&complete, 2);
    assert_eq!(trap_row["ID"], json!(100));
    assert_eq!(trap_row["conservative estimate Mt"].as_f64(), Some(6.0));

    let keys: Vec<&String> = storage_row.keys().collect();
    for f in features {
        let p = f["properties"].as_object().unwrap();
        assert_eq!(p.keys().collect::<Vec<_>>(), keys);

        let mut stack = vec![&f["geometry"]["coordinates"]];
        while let Some(v) = stack.pop() {
            let items = v.as_array().unwrap();
            if items.first().map_or(false, Value::is_number) {
                assert_eq!(items.len(), 2, "position {v} still has elevation");
            } else {
                stack.extend(items.iter());
            }
        }
    }
}

#[test]
fn intermediates_survive_a_failing_trap_stage() {
    let dir = tempfile::tempdir().unwrap();
    write_storage_inputs(dir.path());
    write_trap_inputs(dir.path());

    let err = run(&config(dir.path(), TableSource::Many(Vec::new()))).unwrap_err();
    assert!(matches!(err, Error::InvalidTableSource));
    assert!(dir.path().join(STORAGE_MAP_FILE).exists());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_trap_id_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_storage_inputs(dir.path());
    write_trap_inputs(dir.path());
    let bad = write(dir.path(), "bad.csv", "ID,EST_STORECAP_MIN\n1,2\n");

    match run(&config(dir.path(), TableSource::Single(bad))) {
        Err(Error::MissingColumn { column, .. }) => assert_eq!(column, "TRAP_ID"),
        other => panic!("expected a missing column error, got {other:?}"),
    }
}

#[test]
fn combining_disjoint_column_sets() {
    let mut storage = GeoTable::new(EPSG_4326, vec!["A".into()]);
    storage.rows.push(GeoRow {
        cells: vec![Cell::Float(1.0)],
        geometry: Some(Shape::Point(smallvec![0.0, 0.0])),
    });
    let mut trap = GeoTable::new(EPSG_4326, vec!["B".into()]);
    trap.rows.push(GeoRow {
        cells: vec![Cell::Float(2.0)],
        geometry: Some(Shape::Point(smallvec![1.0, 1.0])),
    });

    let combined = combine(storage, trap).unwrap();
    assert_eq!(combined.columns, vec!["A", "B"]);
    assert!(combined.has_column("geometry"));
    assert_eq!(combined.len(), 2);
    assert_eq!(combined.rows[0].cells[1].as_f64(), Some(0.0));
    assert_eq!(combined.rows[1].cells[0].as_f64(), Some(0.0));
}

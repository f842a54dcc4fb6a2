// End-to-end pipeline scenarios
//
// Run with: cargo test --test pipeline_tests

use approx::assert_relative_eq;
use chrono::NaiveDate;
use nvrmap_rust::geometry::parse_wkt_polygon;
use nvrmap_rust::{
    derive_legacy, AttributeTable, Config, MemoryPolygonSource, NvrmapError, OutputMode, Pipeline,
    PolygonRecord, ProcessingOptions,
};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Fixtures
// ============================================================================

const BENCHMARKS: &str = "\
BIOEVCCODE,EVC_NAME,BCS_CATEGORY
VVP_0055,Plains Grassy Woodland,Endangered
STIF0132,Plains Grassland,TBC
GGP_0175_61,Grassy Woodland,Vulnerable
";

const EXPORT: &str = "\
evc,x_evcname,view_pfi,bioregcode,bioregion,geom
55,Plains Grassy Woodland,123456,VVP,Victorian Volcanic Plain,\"POLYGON ((0 0, 100 0, 100 100, 0 100, 0 0))\"
132,Plains Grassland,789012,STIF,Strzelecki Foothills,\"POLYGON ((0 0, 200 0, 200 100, 0 100, 0 0))\"
175,Grassy Woodland,123456,GGP,Goldfields,\"POLYGON ((0 0, 50 0, 50 50, 0 50, 0 0))\"
";

fn record(parcel: &str, bioregion: &str, evc: f64, side: f64) -> PolygonRecord {
    PolygonRecord {
        vegetation_class: evc,
        vegetation_class_name: format!("EVC {}", evc),
        parent_parcel_id: parcel.to_string(),
        bioregion_code: bioregion.to_string(),
        bioregion_name: bioregion.to_string(),
        geometry: parse_wkt_polygon(&format!(
            "POLYGON ((0 0, {s} 0, {s} {s}, 0 {s}, 0 0))",
            s = side
        ))
        .unwrap(),
    }
}

fn config(evc_data: Option<PathBuf>) -> Config {
    Config {
        evc_data,
        attribute_table: AttributeTable {
            project: "PRJ_1".to_string(),
            collector: "Field Team".to_string(),
            default_habitat_score: 0.4,
            default_gain_score: 0.22,
        },
        ..Config::default()
    }
}

fn memory_pipeline(evc_data: Option<PathBuf>) -> Pipeline {
    let source = MemoryPolygonSource {
        records: vec![
            record("123456", "VVP", 55.0, 100.0),
            record("789012", "STIF", 132.0, 200.0),
            record("123456", "GGP", 175.0, 50.0),
            record("555555", "VVP", 68.0, 10.0),
        ],
        properties: vec![
            ("900".to_string(), "123456".to_string()),
            ("900".to_string(), "789012".to_string()),
        ],
    };
    Pipeline::new(config(evc_data), Box::new(source))
}

fn write_benchmarks(dir: &Path) -> PathBuf {
    let path = dir.join("benchmarks.csv");
    fs::write(&path, BENCHMARKS).unwrap();
    path
}

fn options(mode: OutputMode) -> ProcessingOptions {
    ProcessingOptions {
        ids: vec!["123456".to_string(), "789012".to_string()],
        mode,
        ..ProcessingOptions::default()
    }
}

fn survey_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn strings(df: &DataFrame, name: &str) -> Vec<String> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect()
}

fn ints(df: &DataFrame, name: &str) -> Vec<i32> {
    df.column(name)
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

// ============================================================================
// Section 1: PlainMap
// ============================================================================

#[test]
fn test_plain_map_two_parcels() {
    let pipeline = memory_pipeline(None);
    let df = pipeline
        .build_output_on(&options(OutputMode::PlainMap), survey_date())
        .unwrap();

    // Records arrive sorted by bioregion: GGP, STIF, VVP
    assert_eq!(df.height(), 3);
    assert_eq!(ints(&df, "site_id"), vec![1, 2, 1]);
    assert_eq!(strings(&df, "zone_id"), vec!["A", "A", "B"]);
    assert_eq!(strings(&df, "veg_codes"), vec!["GGP_0175", "STIF0132", "VVP_0055"]);
    assert_eq!(strings(&df, "prop_id"), vec!["PRJ_1"; 3]);
    assert_eq!(strings(&df, "cp"), vec!["Field Team"; 3]);
    assert_eq!(strings(&df, "type"), vec!["p"; 3]);
    assert_eq!(ints(&df, "surv_date"), vec![20240315; 3]);
    assert_eq!(ints(&df, "lt_count"), vec![0; 3]);

    let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, OutputMode::PlainMap.column_names());
}

#[test]
fn test_plain_map_ignores_missing_benchmark() {
    let pipeline = memory_pipeline(Some(PathBuf::from("/nonexistent/benchmarks.csv")));
    assert!(pipeline
        .build_output_on(&options(OutputMode::PlainMap), survey_date())
        .is_ok());
}

#[test]
fn test_gain_score_override_applies_to_every_row() {
    let pipeline = memory_pipeline(None);
    let mut opts = options(OutputMode::PlainMap);
    opts.gain_score = Some(0.31);

    let df = pipeline.build_output_on(&opts, survey_date()).unwrap();
    let gains = df.column("gain_score").unwrap().f64().unwrap();
    assert!(gains.into_iter().all(|g| g == Some(0.31)));
}

// ============================================================================
// Section 2: Report layouts
// ============================================================================

#[test]
fn test_detailed_report_status_and_area() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = memory_pipeline(Some(write_benchmarks(dir.path())));

    let df = pipeline
        .build_output_on(&options(OutputMode::DetailedReport), survey_date())
        .unwrap();

    assert_eq!(strings(&df, "HH_EVC"), vec!["GGP_0175", "STIF0132", "VVP_0055"]);
    // Sub-EVC match, TBC fallback, first letter
    assert_eq!(strings(&df, "BCS"), vec!["V", "LC", "E"]);
    assert_eq!(strings(&df, "HH_VAC"), vec!["P"; 3]);
    assert_eq!(df.column("HH_D").unwrap().dtype(), &DataType::Date);

    let areas: Vec<f64> = df
        .column("HH_A")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect();
    assert_relative_eq!(areas[0], 0.25);
    assert_relative_eq!(areas[1], 4.0);
    assert_relative_eq!(areas[2], 1.0);
}

#[test]
fn test_legacy_report_matches_derived_detailed() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = memory_pipeline(Some(write_benchmarks(dir.path())));

    let detailed = pipeline
        .build_output_on(&options(OutputMode::DetailedReport), survey_date())
        .unwrap();
    let legacy = pipeline
        .build_output_on(&options(OutputMode::LegacyReport), survey_date())
        .unwrap();

    assert!(legacy.equals(&derive_legacy(&detailed).unwrap()));
    let names: Vec<&str> = legacy.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, OutputMode::LegacyReport.column_names());
    assert!(legacy.column("BCS").is_err());
}

#[test]
fn test_report_without_benchmark_is_fatal() {
    let pipeline = memory_pipeline(None);
    for mode in [OutputMode::DetailedReport, OutputMode::LegacyReport] {
        let err = pipeline.build_output_on(&options(mode), survey_date()).unwrap_err();
        assert!(matches!(err, NvrmapError::Benchmark(_)), "{:?}", err);
    }

    let pipeline = memory_pipeline(Some(PathBuf::from("/nonexistent/benchmarks.csv")));
    let err = pipeline
        .build_output_on(&options(OutputMode::DetailedReport), survey_date())
        .unwrap_err();
    assert!(matches!(err, NvrmapError::Benchmark(_)));
}

// ============================================================================
// Section 3: Input handling
// ============================================================================

#[test]
fn test_unknown_parcels_report_no_results() {
    let pipeline = memory_pipeline(None);
    let opts = ProcessingOptions {
        ids: vec!["1".to_string()],
        ..ProcessingOptions::default()
    };
    let err = pipeline.build_output_on(&opts, survey_date()).unwrap_err();
    assert!(matches!(err, NvrmapError::NoResults));
    assert_eq!(
        err.to_string(),
        "No search results found. Check your View PFI values."
    );
}

#[test]
fn test_property_view_expands_to_parcels() {
    let pipeline = memory_pipeline(None);
    let opts = ProcessingOptions {
        ids: vec!["900".to_string()],
        property_view: true,
        ..ProcessingOptions::default()
    };
    let df = pipeline.build_output_on(&opts, survey_date()).unwrap();
    assert_eq!(ints(&df, "site_id"), vec![1, 2, 1]);

    let unknown = ProcessingOptions {
        ids: vec!["901".to_string()],
        property_view: true,
        ..ProcessingOptions::default()
    };
    assert!(matches!(
        pipeline.build_output_on(&unknown, survey_date()),
        Err(NvrmapError::NoResults)
    ));
}

#[test]
fn test_single_parcel_zones_follow_record_order() {
    let source = MemoryPolygonSource {
        records: (0..28).map(|i| record("42", "VVP", i as f64, 10.0)).collect(),
        properties: Vec::new(),
    };
    let pipeline = Pipeline::new(config(None), Box::new(source));
    let opts = ProcessingOptions {
        ids: vec!["42".to_string()],
        ..ProcessingOptions::default()
    };

    let zones = strings(&pipeline.build_output_on(&opts, survey_date()).unwrap(), "zone_id");
    assert_eq!(zones[0], "A");
    assert_eq!(zones[25], "Z");
    assert_eq!(zones[26], "AA");
    assert_eq!(zones[27], "AB");
}

// ============================================================================
// Section 4: File export source and writing
// ============================================================================

#[test]
fn test_generate_from_export_writes_directory() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("intersections.csv");
    fs::write(&export, EXPORT).unwrap();

    let mut config = config(None);
    config.sources.polygon_data = Some(export);
    let pipeline = Pipeline::from_config(config).unwrap();

    let target = dir.path().join("site_plan");
    let opts = ProcessingOptions {
        output: target.clone(),
        ..options(OutputMode::PlainMap)
    };
    let df = pipeline.generate(&opts).unwrap();
    assert_eq!(df.height(), 3);

    let csv = fs::read_to_string(target.join("site_plan.csv")).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("site_id,zone_id,prop_id"));
    assert!(header.ends_with("geometry"));
    assert!(target.join("site_plan.schema.json").is_file());
}

#[test]
fn test_generate_parquet_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = memory_pipeline(Some(write_benchmarks(dir.path())));

    let target = dir.path().join("report.parquet");
    let opts = ProcessingOptions {
        output: target.clone(),
        ..options(OutputMode::DetailedReport)
    };
    let written = pipeline.generate(&opts).unwrap();

    let back = nvrmap_rust::data::read_table(&target).unwrap();
    assert!(back.equals(&written));
}

#[test]
fn test_failed_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = memory_pipeline(None);
    let target = dir.path().join("empty");
    let opts = ProcessingOptions {
        ids: vec!["1".to_string()],
        output: target.clone(),
        ..ProcessingOptions::default()
    };

    assert!(pipeline.generate(&opts).is_err());
    assert!(!target.exists());
}

//! Output Writer
//!
//! Writes the projected table. A target ending in `.csv` or `.parquet` is
//! written as that one file. Anything else is an output directory, the way
//! shapefiles are delivered: `<name>/<name>.csv` plus `<name>/<name>.schema.json`
//! recording the field layout, geometry encoding and CRS.
//!
//! Failures are not retried.

use crate::error::{NvrmapError, Result};
use crate::geometry::DEFAULT_CRS;
use crate::schema::{FieldSpec, OutputMode, GEOMETRY_FIELD};
use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct GeometrySpec {
    column: &'static str,
    kind: &'static str,
    encoding: &'static str,
    crs: &'static str,
}

#[derive(Debug, Serialize)]
struct SchemaSidecar {
    mode: OutputMode,
    format: &'static str,
    fields: &'static [FieldSpec],
    geometry: GeometrySpec,
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|e| NvrmapError::write(path, e))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| NvrmapError::write(path, e))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| NvrmapError::write(path, e))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| NvrmapError::write(path, e))?;
    Ok(())
}

fn write_sidecar(path: &Path, mode: OutputMode) -> Result<()> {
    let sidecar = SchemaSidecar {
        mode,
        format: mode.name(),
        fields: mode.schema(),
        geometry: GeometrySpec {
            column: GEOMETRY_FIELD,
            kind: "Polygon",
            encoding: "WKT",
            crs: DEFAULT_CRS,
        },
    };
    let json = serde_json::to_string_pretty(&sidecar)?;
    fs::write(path, json).map_err(|e| NvrmapError::write(path, e))
}

/// Write `df` to `target`, returning the path of the data file
pub fn write_output(df: &mut DataFrame, target: &Path, mode: OutputMode) -> Result<PathBuf> {
    tracing::info!("Current columns: {:?}", df.get_column_names());
    tracing::info!("Writing output: {}", target.display());

    let extension = target
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => {
            write_csv(df, target)?;
            Ok(target.to_path_buf())
        }
        Some("parquet") => {
            write_parquet(df, target)?;
            Ok(target.to_path_buf())
        }
        _ => {
            fs::create_dir_all(target).map_err(|e| NvrmapError::write(target, e))?;
            let stem = target
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("output");

            let data_path = target.join(format!("{}.csv", stem));
            write_csv(df, &data_path)?;
            write_sidecar(&target.join(format!("{}.schema.json", stem)), mode)?;
            Ok(data_path)
        }
    }
}

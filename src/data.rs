//! Input Data Loading
//!
//! The spatial engine (buffer, intersect, dump) runs outside this crate and
//! hands over one row per dumped polygon. This module turns that export into
//! ordered `PolygonRecord`s.
//!
//! Expected export columns:
//!   1. evc        - EVC number
//!   2. x_evcname  - EVC name
//!   3. view_pfi   - parent parcel id
//!   4. bioregcode - bioregion code
//!   5. bioregion  - bioregion name
//!   6. geom       - WKT polygon (EPSG:7899)

use crate::error::{NvrmapError, Result};
use crate::geometry::parse_wkt_polygon;
use geo::Polygon;
use polars::prelude::*;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

/// One dumped polygon with its intersected attributes
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonRecord {
    /// EVC number as delivered (truncated when formatted)
    pub vegetation_class: f64,
    pub vegetation_class_name: String,
    pub parent_parcel_id: String,
    pub bioregion_code: String,
    pub bioregion_name: String,
    pub geometry: Polygon<f64>,
}

/// Boundary to the external spatial engine
///
/// Implementations must return records sorted by bioregion code, keeping
/// arrival order within a bioregion. Zone lettering depends on that order.
pub trait PolygonSource: Send + Sync {
    fn fetch_polygons(&self, parcel_ids: &[String]) -> Result<Vec<PolygonRecord>>;

    /// Expand property-level ids into their parcel ids
    fn parcels_for_properties(&self, property_ids: &[String]) -> Result<Vec<String>>;
}

/// Read a CSV or Parquet table, chosen by file extension
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let df = match extension.as_deref() {
        Some("parquet") => LazyFrame::scan_parquet(path, Default::default())?.collect()?,
        _ => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
    };
    Ok(df)
}

/// Canonical form of a PFI typed by a user
///
/// Digits only; leading zeros are dropped so "0123" and "123" name the same
/// parcel, matching the integer ids in the export.
pub fn parse_pfi(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let trimmed = raw.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
}

/// Column values as strings, whatever dtype the reader inferred
pub(crate) fn string_column(
    df: &DataFrame,
    name: &str,
    context: &str,
) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| NvrmapError::Config(format!("{}: missing column '{}'", context, name)))?
        .cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn float_column(df: &DataFrame, name: &str, context: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| NvrmapError::Config(format!("{}: missing column '{}'", context, name)))?
        .cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

fn required<T>(value: Option<T>, column: &str, row: usize) -> Result<T> {
    value.ok_or_else(|| {
        NvrmapError::Config(format!("polygon export: null '{}' in row {}", column, row))
    })
}

/// Convert an export frame into records, preserving row order
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<PolygonRecord>> {
    const CONTEXT: &str = "polygon export";

    let evc = float_column(df, "evc", CONTEXT)?;
    let evc_name = string_column(df, "x_evcname", CONTEXT)?;
    let view_pfi = string_column(df, "view_pfi", CONTEXT)?;
    let bioregcode = string_column(df, "bioregcode", CONTEXT)?;
    let bioregion = string_column(df, "bioregion", CONTEXT)?;
    let geom = string_column(df, "geom", CONTEXT)?;

    let mut records = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let geometry_text = required(geom[idx].as_deref(), "geom", idx)?;
        records.push(PolygonRecord {
            vegetation_class: required(evc[idx], "evc", idx)?,
            // Unnamed classes are tolerated, the name is descriptive only
            vegetation_class_name: evc_name[idx].clone().unwrap_or_default(),
            parent_parcel_id: required(view_pfi[idx].clone(), "view_pfi", idx)?,
            bioregion_code: required(bioregcode[idx].clone(), "bioregcode", idx)?,
            bioregion_name: bioregion[idx].clone().unwrap_or_default(),
            geometry: parse_wkt_polygon(geometry_text)?,
        });
    }
    Ok(records)
}

/// Order records the way the spatial query does: bioregion code ascending,
/// arrival order kept within a bioregion.
pub fn sort_by_bioregion(records: &mut [PolygonRecord]) {
    // slice::sort_by is stable
    records.sort_by(|a, b| a.bioregion_code.cmp(&b.bioregion_code));
}

/// Reads the spatial engine's file export
pub struct ExportPolygonSource {
    polygon_path: PathBuf,
    property_path: Option<PathBuf>,
}

impl ExportPolygonSource {
    pub fn new(polygon_path: impl Into<PathBuf>, property_path: Option<PathBuf>) -> Result<Self> {
        let polygon_path = polygon_path.into();
        if !polygon_path.exists() {
            return Err(NvrmapError::Config(format!(
                "polygon data not found at {}",
                polygon_path.display()
            )));
        }
        Ok(Self {
            polygon_path,
            property_path,
        })
    }
}

impl PolygonSource for ExportPolygonSource {
    fn fetch_polygons(&self, parcel_ids: &[String]) -> Result<Vec<PolygonRecord>> {
        let df = read_table(&self.polygon_path)?;

        // Filter to requested parcels using boolean mask
        let wanted: FxHashSet<&str> = parcel_ids.iter().map(String::as_str).collect();
        let ids = string_column(&df, "view_pfi", "polygon export")?;
        let mask: BooleanChunked = ids
            .iter()
            .map(|id| id.as_deref().map_or(false, |s| wanted.contains(s)))
            .collect();
        let filtered = df.filter(&mask)?;

        let mut records = frame_to_records(&filtered)?;
        sort_by_bioregion(&mut records);

        tracing::info!(
            "Loaded {} polygons for {} parcels from {}",
            records.len(),
            parcel_ids.len(),
            self.polygon_path.display()
        );
        Ok(records)
    }

    fn parcels_for_properties(&self, property_ids: &[String]) -> Result<Vec<String>> {
        let path = self.property_path.as_deref().ok_or_else(|| {
            NvrmapError::Config(
                "property ids requested but no property_data configured".to_string(),
            )
        })?;
        let df = read_table(path)?;

        let wanted: FxHashSet<&str> = property_ids.iter().map(String::as_str).collect();
        let properties = string_column(&df, "property_pfi", "property table")?;
        let parcels = string_column(&df, "view_pfi", "property table")?;

        let mut seen = FxHashSet::default();
        let mut resolved = Vec::new();
        for (property, parcel) in properties.iter().zip(parcels) {
            let (Some(property), Some(parcel)) = (property.as_deref(), parcel) else {
                continue;
            };
            if wanted.contains(property) && seen.insert(parcel.clone()) {
                resolved.push(parcel);
            }
        }

        tracing::info!(
            "Resolved {} properties to {} parcels",
            property_ids.len(),
            resolved.len()
        );
        Ok(resolved)
    }
}

/// Source over records already held in memory
///
/// For callers that run their own spatial step. Records are filtered and
/// ordered exactly as the file export would be.
#[derive(Debug, Clone, Default)]
pub struct MemoryPolygonSource {
    pub records: Vec<PolygonRecord>,
    /// (property id, parcel id) pairs
    pub properties: Vec<(String, String)>,
}

impl PolygonSource for MemoryPolygonSource {
    fn fetch_polygons(&self, parcel_ids: &[String]) -> Result<Vec<PolygonRecord>> {
        let mut records: Vec<PolygonRecord> = self
            .records
            .iter()
            .filter(|r| parcel_ids.contains(&r.parent_parcel_id))
            .cloned()
            .collect();
        sort_by_bioregion(&mut records);
        Ok(records)
    }

    fn parcels_for_properties(&self, property_ids: &[String]) -> Result<Vec<String>> {
        let mut resolved: Vec<String> = Vec::new();
        for (property, parcel) in &self.properties {
            if property_ids.contains(property) && !resolved.contains(parcel) {
                resolved.push(parcel.clone());
            }
        }
        Ok(resolved)
    }
}

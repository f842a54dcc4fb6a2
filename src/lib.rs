//! NVRMap Rust Implementation
//!
//! Turns the vegetation polygons intersected with a set of land parcels into
//! offset mapping tables (site/zone numbering, bioregion/EVC codes,
//! conservation status, attribution) in one of three output layouts.
//!
//! Module structure:
//! - `data`: polygon records and the spatial engine boundary
//! - `classify/`: code formatting, site/zone numbering, row classification
//! - `benchmark`: BCS lookup from the EVC benchmark table
//! - `schema`: output layouts and projection
//! - `writer`: CSV / Parquet / directory output
//! - `pipeline`: one run end to end
//! - `web/`: upload form front-end (feature `api`)

pub mod benchmark;
pub mod classify;
pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod schema;
pub mod writer;

#[cfg(feature = "api")]
pub mod web;

// Re-export commonly used types
pub use benchmark::{BenchmarkEntry, BenchmarkTable};
pub use classify::{
    classify_row, classify_rows, format_bioevc, resolve_site_id, zone_label, ClassificationState,
    ClassifiedRow, SiteIndex, ZoneCounter, ZoneScheme,
};
pub use config::{load_config, AttributeTable, Config, EnvOverrides};
pub use data::{ExportPolygonSource, MemoryPolygonSource, PolygonRecord, PolygonSource};
pub use error::{NvrmapError, Result};
pub use pipeline::{Pipeline, ProcessingOptions};
pub use schema::{derive_legacy, project, Attribution, OutputMode};
pub use writer::write_output;

#[cfg(feature = "api")]
pub use web::{create_router, AppState};

//! Error taxonomy for a mapping run
//!
//! Every fatal condition surfaces as an `NvrmapError`. The two recoverable
//! cases (site resolution miss, benchmark lookup miss) never reach this type;
//! they are logged and replaced by their fallback values where they occur.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NvrmapError {
    /// Missing or invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} environment variable is not set.")]
    MissingEnv(&'static str),

    #[error("Config file not found at {}", .0.display())]
    ConfigFileNotFound(PathBuf),

    /// The spatial query produced no polygons for the requested parcels
    #[error("No search results found. Check your View PFI values.")]
    NoResults,

    #[error("Benchmark data error: {0}")]
    Benchmark(String),

    /// A schema asked for a value the classified rows do not carry.
    /// This is a programming error, never padded over.
    #[error("Field '{field}' is not available for {mode} output")]
    MissingField { field: &'static str, mode: &'static str },

    #[error("Zone counter value {value} has no defined label under the {scheme} scheme")]
    ZoneIndex { value: u32, scheme: &'static str },

    #[error("Invalid polygon geometry: {0}")]
    Geometry(String),

    #[error("Failed to write to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NvrmapError>;

impl NvrmapError {
    /// Wrap any I/O or serialization failure raised while writing output
    pub fn write<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        NvrmapError::Write {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

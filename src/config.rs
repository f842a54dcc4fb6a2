//! Run Configuration
//!
//! Reads `$NVRMAP_CONFIG/config.json` and layers `NVRMAP_*` environment
//! overrides on top of it.
//!
//! Priority (highest to lowest):
//! 1. Environment variables (`NVRMAP_POLYGON_DATA`, `NVRMAP_EVC_DATA`, ...)
//! 2. Config file
//! 3. Built-in attribute defaults
//!
//! Environment values are trimmed; empty or whitespace-only values are ignored.

use crate::error::{NvrmapError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_VAR: &str = "NVRMAP_CONFIG";
pub const CONFIG_FILE_NAME: &str = "config.json";

const ENV_POLYGON_DATA: &str = "NVRMAP_POLYGON_DATA";
const ENV_PROPERTY_DATA: &str = "NVRMAP_PROPERTY_DATA";
const ENV_EVC_DATA: &str = "NVRMAP_EVC_DATA";
const ENV_PROJECT: &str = "NVRMAP_PROJECT";
const ENV_COLLECTOR: &str = "NVRMAP_COLLECTOR";

/// Locations of the spatial engine's exports
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcePaths {
    /// Parcel x EVC x bioregion intersection export (CSV or Parquet)
    #[serde(default)]
    pub polygon_data: Option<PathBuf>,

    /// Property -> parcel mapping table, needed only for property-level ids
    #[serde(default)]
    pub property_data: Option<PathBuf>,
}

/// Static attribution written into every output row
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeTable {
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_collector")]
    pub collector: String,
    #[serde(default = "default_habitat_score")]
    pub default_habitat_score: f64,
    #[serde(default = "default_gain_score")]
    pub default_gain_score: f64,
}

fn default_project() -> String {
    "Python".to_string()
}

fn default_collector() -> String {
    "Desktop".to_string()
}

fn default_habitat_score() -> f64 {
    0.4
}

fn default_gain_score() -> f64 {
    0.22
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self {
            project: default_project(),
            collector: default_collector(),
            default_habitat_score: default_habitat_score(),
            default_gain_score: default_gain_score(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcePaths,

    /// EVC benchmark table (BIOEVCCODE -> BCS_CATEGORY)
    #[serde(default)]
    pub evc_data: Option<PathBuf>,

    #[serde(default)]
    pub attribute_table: AttributeTable,
}

/// Snapshot of the environment variables the loader cares about
///
/// Loading goes through this instead of `std::env` directly so tests can
/// supply their own environment without touching the process.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    vars: HashMap<String, String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        let vars = std::env::vars()
            .filter(|(key, _)| key.starts_with("NVRMAP_") || key == "HOME")
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { vars }
    }

    /// Trimmed value, or `None` when unset or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl Config {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NvrmapError::ConfigFileNotFound(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    fn apply_overrides(&mut self, env: &EnvOverrides) {
        if let Some(v) = env.get(ENV_POLYGON_DATA) {
            self.sources.polygon_data = Some(PathBuf::from(v));
        }
        if let Some(v) = env.get(ENV_PROPERTY_DATA) {
            self.sources.property_data = Some(PathBuf::from(v));
        }
        if let Some(v) = env.get(ENV_EVC_DATA) {
            self.evc_data = Some(PathBuf::from(v));
        }
        if let Some(v) = env.get(ENV_PROJECT) {
            self.attribute_table.project = v.to_string();
        }
        if let Some(v) = env.get(ENV_COLLECTOR) {
            self.attribute_table.collector = v.to_string();
        }
    }

    fn expand_paths(&mut self, home: Option<&str>) {
        for path in [
            &mut self.sources.polygon_data,
            &mut self.sources.property_data,
            &mut self.evc_data,
        ]
        .into_iter()
        .flatten()
        {
            *path = expand_home(path, home);
        }
    }

    /// Polygon export path; its absence is fatal before any processing
    pub fn polygon_data(&self) -> Result<&Path> {
        self.sources
            .polygon_data
            .as_deref()
            .ok_or_else(|| NvrmapError::Config("no polygon_data source configured".to_string()))
    }
}

/// Load configuration from the file named by `NVRMAP_CONFIG` plus overrides
///
/// The file may be omitted entirely when the environment supplies the
/// polygon source on its own.
pub fn load_config(env: &EnvOverrides) -> Result<Config> {
    let mut config = match env.get(CONFIG_DIR_VAR) {
        Some(dir) => Config::from_file(&Path::new(dir).join(CONFIG_FILE_NAME))?,
        None if env.get(ENV_POLYGON_DATA).is_some() => Config::default(),
        None => return Err(NvrmapError::MissingEnv(CONFIG_DIR_VAR)),
    };

    config.apply_overrides(env);
    config.expand_paths(env.get("HOME"));

    // Fail early rather than after the benchmark table is read
    config.polygon_data()?;

    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}

fn expand_home(path: &Path, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => Path::new(home).join(rest),
        _ => path.to_path_buf(),
    }
}

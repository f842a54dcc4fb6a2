//! EVC Benchmark Table
//!
//! Maps combined bioregion/EVC codes to a Bioregional Conservation Status
//! (BCS). Loaded once per run from the published benchmark spreadsheet
//! (exported to CSV or Parquet) and read-only afterwards.
//!
//! Matching is by substring containment, first row in table order wins.
//! Sub-EVC codes such as "VVP_0055_1" therefore resolve through their parent
//! code, and a short code can hit an unrelated longer one. Historical reports
//! depend on this, so it is kept as is.

use crate::data::{read_table, string_column};
use crate::error::{NvrmapError, Result};
use std::path::Path;

pub const KEY_COLUMN: &str = "BIOEVCCODE";
pub const STATUS_COLUMN: &str = "BCS_CATEGORY";

/// Least Concern, also the fallback for every unusable status
pub const LEAST_CONCERN: &str = "LC";

/// Placeholder used in the source for unassessed classes
const TO_BE_CONFIRMED: &str = "TBC";

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkEntry {
    pub code: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BenchmarkTable {
    entries: Vec<BenchmarkEntry>,
}

impl BenchmarkTable {
    /// Load from a CSV or Parquet export of the benchmark spreadsheet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NvrmapError::Benchmark(format!(
                "benchmark file not found at {}",
                path.display()
            )));
        }

        let df = read_table(path)
            .map_err(|e| NvrmapError::Benchmark(format!("{}: {}", path.display(), e)))?;
        let codes = string_column(&df, KEY_COLUMN, "benchmark table")?;
        let statuses = string_column(&df, STATUS_COLUMN, "benchmark table")?;

        let entries: Vec<BenchmarkEntry> = codes
            .into_iter()
            .zip(statuses)
            .filter_map(|(code, status)| code.map(|code| BenchmarkEntry { code, status }))
            .collect();

        tracing::info!("Loaded {} benchmark entries from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<BenchmarkEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose key contains `combined_code`
    fn first_match(&self, combined_code: &str) -> Option<&BenchmarkEntry> {
        self.entries.iter().find(|e| e.code.contains(combined_code))
    }

    /// BCS code for a combined code
    ///
    /// - no match, blank/missing status or "TBC" -> "LC"
    /// - "LC" -> "LC"
    /// - anything else -> its first character ("Endangered" -> "E")
    ///
    /// Only the blank check trims; the first character is taken from the
    /// stored value as is.
    pub fn lookup(&self, combined_code: &str) -> String {
        let Some(entry) = self.first_match(combined_code) else {
            tracing::warn!(
                "No benchmark entry for {}, defaulting to {}",
                combined_code,
                LEAST_CONCERN
            );
            return LEAST_CONCERN.to_string();
        };

        let status = entry.status.as_deref().unwrap_or_default();
        if status.trim().is_empty() || status == TO_BE_CONFIRMED {
            tracing::warn!(
                "Benchmark status for {} is unusable ({:?}), defaulting to {}",
                combined_code,
                entry.status,
                LEAST_CONCERN
            );
            return LEAST_CONCERN.to_string();
        }

        if status == LEAST_CONCERN {
            return LEAST_CONCERN.to_string();
        }
        status
            .chars()
            .next()
            .map(String::from)
            .unwrap_or_else(|| LEAST_CONCERN.to_string())
    }
}

//! Site numbering
//!
//! A site is one parcel (or property) of the batch, numbered from 1 in the
//! order the caller listed them. A single-parcel batch is always site 1.

use rustc_hash::FxHashMap;

/// 1-based site number of `parcel_id` within `batch`
///
/// Ids missing from a multi-parcel batch fall back to site 1 with a warning.
pub fn resolve_site_id(batch: &[String], parcel_id: &str) -> u32 {
    if batch.len() <= 1 {
        return 1;
    }
    match batch.iter().position(|id| id == parcel_id) {
        Some(idx) => idx as u32 + 1,
        None => {
            tracing::warn!("Parcel {} not in batch, assigning site 1", parcel_id);
            1
        }
    }
}

/// Precomputed site numbers for one run
///
/// Same answers as `resolve_site_id`, without rescanning the batch per row.
#[derive(Debug, Clone)]
pub struct SiteIndex {
    positions: FxHashMap<String, u32>,
    site_count: u32,
}

impl SiteIndex {
    pub fn new(batch: &[String]) -> Self {
        let mut positions = FxHashMap::default();
        if batch.len() > 1 {
            for (idx, id) in batch.iter().enumerate() {
                // Duplicates keep their first position
                positions.entry(id.clone()).or_insert(idx as u32 + 1);
            }
        }
        Self {
            positions,
            site_count: batch.len().max(1) as u32,
        }
    }

    /// Number of sites the batch defines (at least 1)
    pub fn site_count(&self) -> u32 {
        self.site_count
    }

    pub fn resolve(&self, parcel_id: &str) -> u32 {
        if self.site_count <= 1 {
            return 1;
        }
        match self.positions.get(parcel_id) {
            Some(&site) => site,
            None => {
                tracing::warn!("Parcel {} not in batch, assigning site 1", parcel_id);
                1
            }
        }
    }
}

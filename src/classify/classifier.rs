//! Row Classifier
//!
//! Sequential fold over the ordered polygon records. For each record, in
//! order:
//!   1. combined bioregion/EVC code
//!   2. site number from the parcel id
//!   3. next zone label for that site
//!   4. BCS rating, only when a benchmark table is supplied
//!
//! Rows are never skipped or reordered. The zone counters live in an explicit
//! `ClassificationState` owned by one run, so concurrent runs cannot share
//! them.

use crate::benchmark::BenchmarkTable;
use crate::classify::bioevc::format_bioevc;
use crate::classify::site::SiteIndex;
use crate::classify::zone::{ZoneCounter, ZoneScheme};
use crate::data::PolygonRecord;
use crate::error::Result;
use crate::geometry::area_hectares;
use geo::Polygon;

/// One classified polygon
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub site_id: u32,
    pub zone_id: String,
    pub combined_code: String,
    /// BCS code; `None` when the run has no status lookup
    pub status_category: Option<String>,
    pub area_ha: f64,
    pub geometry: Polygon<f64>,
}

/// Mutable state of one classification run
#[derive(Debug, Clone)]
pub struct ClassificationState {
    sites: SiteIndex,
    zones: ZoneCounter,
}

impl ClassificationState {
    pub fn new(batch: &[String], scheme: ZoneScheme) -> Self {
        let sites = SiteIndex::new(batch);
        let zones = ZoneCounter::new(sites.site_count(), scheme);
        Self { sites, zones }
    }

    pub fn zones(&self) -> &ZoneCounter {
        &self.zones
    }
}

/// Classify a single record, advancing the run state
pub fn classify_row(
    record: &PolygonRecord,
    state: &mut ClassificationState,
    benchmark: Option<&BenchmarkTable>,
) -> Result<ClassifiedRow> {
    let combined_code = format_bioevc(&record.bioregion_code, record.vegetation_class);
    let site_id = state.sites.resolve(&record.parent_parcel_id);
    let zone_id = state.zones.next_zone_label(site_id)?;
    let status_category = benchmark.map(|table| table.lookup(&combined_code));

    tracing::debug!(
        "parcel {} -> site {} zone {} ({})",
        record.parent_parcel_id,
        site_id,
        zone_id,
        combined_code
    );

    Ok(ClassifiedRow {
        site_id,
        zone_id,
        combined_code,
        status_category,
        area_ha: area_hectares(&record.geometry),
        geometry: record.geometry.clone(),
    })
}

/// Classify every record in input order with fresh state
pub fn classify_rows(
    records: &[PolygonRecord],
    batch: &[String],
    benchmark: Option<&BenchmarkTable>,
    scheme: ZoneScheme,
) -> Result<Vec<ClassifiedRow>> {
    let state = ClassificationState::new(batch, scheme);
    let (_, rows) = records.iter().try_fold(
        (state, Vec::with_capacity(records.len())),
        |(mut state, mut rows), record| {
            rows.push(classify_row(record, &mut state, benchmark)?);
            Ok::<_, crate::error::NvrmapError>((state, rows))
        },
    )?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::BenchmarkEntry;
    use crate::geometry::parse_wkt_polygon;
    use approx::assert_relative_eq;

    fn record(parcel: &str, bioregion: &str, evc: f64) -> PolygonRecord {
        PolygonRecord {
            vegetation_class: evc,
            vegetation_class_name: format!("EVC {}", evc),
            parent_parcel_id: parcel.to_string(),
            bioregion_code: bioregion.to_string(),
            bioregion_name: bioregion.to_string(),
            geometry: parse_wkt_polygon("POLYGON ((0 0, 100 0, 100 100, 0 100, 0 0))").unwrap(),
        }
    }

    fn batch(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_parcel_scenario() {
        let records = vec![
            record("123456", "VVP", 55.0),
            record("789012", "STIF", 132.0),
            record("123456", "GGP", 175.0),
        ];
        let rows = classify_rows(
            &records,
            &batch(&["123456", "789012"]),
            None,
            ZoneScheme::Bijective,
        )
        .unwrap();

        let sites: Vec<u32> = rows.iter().map(|r| r.site_id).collect();
        let zones: Vec<&str> = rows.iter().map(|r| r.zone_id.as_str()).collect();
        let codes: Vec<&str> = rows.iter().map(|r| r.combined_code.as_str()).collect();
        assert_eq!(sites, vec![1, 2, 1]);
        assert_eq!(zones, vec!["A", "A", "B"]);
        assert_eq!(codes, vec!["VVP_0055", "STIF0132", "GGP_0175"]);
        assert!(rows.iter().all(|r| r.status_category.is_none()));
        assert_relative_eq!(rows[0].area_ha, 1.0);
    }

    #[test]
    fn test_single_parcel_multiple_zones() {
        let records: Vec<PolygonRecord> = (0..5).map(|i| record("1", "VVP", i as f64)).collect();
        let rows = classify_rows(&records, &batch(&["1"]), None, ZoneScheme::Bijective).unwrap();
        let zones: Vec<&str> = rows.iter().map(|r| r.zone_id.as_str()).collect();
        assert_eq!(zones, vec!["A", "B", "C", "D", "E"]);
        assert!(rows.iter().all(|r| r.site_id == 1));
    }

    #[test]
    fn test_unknown_parcel_counts_on_site_one() {
        let records = vec![record("1", "VVP", 1.0), record("404", "VVP", 2.0)];
        let rows =
            classify_rows(&records, &batch(&["1", "2"]), None, ZoneScheme::Bijective).unwrap();
        assert_eq!(rows[1].site_id, 1);
        assert_eq!(rows[1].zone_id, "B");
    }

    #[test]
    fn test_status_lookup_when_table_given() {
        let table = BenchmarkTable::from_entries(vec![BenchmarkEntry {
            code: "VVP_0055".to_string(),
            status: Some("Endangered".to_string()),
        }]);
        let records = vec![record("1", "VVP", 55.0), record("1", "GGP", 3.0)];
        let rows = classify_rows(&records, &batch(&["1"]), Some(&table), ZoneScheme::Bijective)
            .unwrap();
        assert_eq!(rows[0].status_category.as_deref(), Some("E"));
        assert_eq!(rows[1].status_category.as_deref(), Some("LC"));
    }

    #[test]
    fn test_state_is_per_run() {
        let records = vec![record("1", "VVP", 1.0)];
        let ids = batch(&["1"]);
        let first = classify_rows(&records, &ids, None, ZoneScheme::Bijective).unwrap();
        let second = classify_rows(&records, &ids, None, ZoneScheme::Bijective).unwrap();
        assert_eq!(first[0].zone_id, "A");
        assert_eq!(second[0].zone_id, "A");
    }

    #[test]
    fn test_legacy_scheme_overflow_aborts() {
        let records: Vec<PolygonRecord> = (0..53).map(|_| record("1", "VVP", 1.0)).collect();
        let result = classify_rows(&records, &batch(&["1"]), None, ZoneScheme::DoubledLetter);
        assert!(result.is_err());
    }

    #[test]
    fn test_manual_state_matches_fold() {
        let ids = batch(&["a", "b"]);
        let mut state = ClassificationState::new(&ids, ZoneScheme::Bijective);
        classify_row(&record("b", "VVP", 1.0), &mut state, None).unwrap();
        classify_row(&record("b", "VVP", 1.0), &mut state, None).unwrap();
        assert_eq!(state.zones().count(2), 2);
        assert_eq!(state.zones().count(1), 0);
    }
}

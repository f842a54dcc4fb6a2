//! Output Schemas and Projection
//!
//! Three fixed layouts, selected once per run:
//! - `PlainMap` (NVRMap upload, default)
//! - `DetailedReport` (EnSym 2017, with BCS and combined EVC code)
//! - `LegacyReport` (EnSym 2013 SBEU, DetailedReport minus three fields)
//!
//! Each layout is a static field list. The projector walks that list, pulls
//! each value from the classified rows or the run attribution, and appends
//! the geometry column last. A field the rows cannot supply is an error,
//! never a padded column.

use crate::classify::ClassifiedRow;
use crate::error::{NvrmapError, Result};
use crate::geometry::to_wkt;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

pub const GEOMETRY_FIELD: &str = "geometry";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    PlainMap,
    DetailedReport,
    LegacyReport,
}

/// Shapefile-style field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Int { width: Option<u8> },
    Str { width: u8 },
    Float { width: u8, precision: u8 },
    Date,
}

/// Where a field's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    SiteId,
    ZoneId,
    ProjectId,
    Collector,
    CombinedCode,
    StatusCategory,
    HabitatScore,
    GainScore,
    AreaHa,
    /// Survey date as an 8-digit YYYYMMDD integer
    SurveyDateNumeric,
    SurveyDate,
    /// Integer counter that is always zero at survey time
    Zero,
    /// Same text on every row
    Literal(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(skip)]
    pub role: FieldRole,
}

const fn field(name: &'static str, field_type: FieldType, role: FieldRole) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        role,
    }
}

const fn int(width: u8) -> FieldType {
    FieldType::Int { width: Some(width) }
}

const INT: FieldType = FieldType::Int { width: None };

const fn text(width: u8) -> FieldType {
    FieldType::Str { width }
}

const fn float(width: u8, precision: u8) -> FieldType {
    FieldType::Float { width, precision }
}

pub static PLAIN_MAP_SCHEMA: &[FieldSpec] = &[
    field("site_id", int(2), FieldRole::SiteId),
    field("zone_id", text(2), FieldRole::ZoneId),
    field("prop_id", text(50), FieldRole::ProjectId),
    field("vlot", INT, FieldRole::Zero),
    field("lot", INT, FieldRole::Zero),
    field("recruits", INT, FieldRole::Zero),
    field("type", text(2), FieldRole::Literal("p")),
    field("cp", text(50), FieldRole::Collector),
    field("veg_codes", text(10), FieldRole::CombinedCode),
    field("lt_count", INT, FieldRole::Zero),
    field("cond_score", float(3, 2), FieldRole::HabitatScore),
    field("gain_score", float(5, 4), FieldRole::GainScore),
    field("surv_date", INT, FieldRole::SurveyDateNumeric),
];

pub static DETAILED_REPORT_SCHEMA: &[FieldSpec] = &[
    field("HH_PAI", text(11), FieldRole::ProjectId),
    field("HH_D", FieldType::Date, FieldRole::SurveyDate),
    field("HH_CP", text(50), FieldRole::Collector),
    field("HH_SI", int(2), FieldRole::SiteId),
    field("HH_ZI", text(2), FieldRole::ZoneId),
    field("HH_VAC", text(2), FieldRole::Literal("P")),
    field("HH_EVC", text(10), FieldRole::CombinedCode),
    field("BCS", text(2), FieldRole::StatusCategory),
    field("LT_CNT", int(5), FieldRole::Zero),
    field("HH_H_S", float(3, 2), FieldRole::HabitatScore),
    field("G_S", float(5, 4), FieldRole::GainScore),
    field("HH_A", float(10, 4), FieldRole::AreaHa),
];

pub static LEGACY_REPORT_SCHEMA: &[FieldSpec] = &[
    field("HH_PAI", text(11), FieldRole::ProjectId),
    field("HH_SI", int(2), FieldRole::SiteId),
    field("HH_ZI", text(2), FieldRole::ZoneId),
    field("HH_VAC", text(2), FieldRole::Literal("P")),
    field("HH_CP", text(50), FieldRole::Collector),
    field("HH_D", FieldType::Date, FieldRole::SurveyDate),
    field("HH_H_S", float(3, 2), FieldRole::HabitatScore),
    field("G_HA", float(5, 4), FieldRole::GainScore),
    field("HH_A", float(10, 4), FieldRole::AreaHa),
];

/// DetailedReport fields absent from LegacyReport
const LEGACY_DROPPED: [&str; 3] = ["HH_EVC", "BCS", "LT_CNT"];

/// (DetailedReport name, LegacyReport name)
const LEGACY_RENAMED: (&str, &str) = ("G_S", "G_HA");

impl OutputMode {
    pub fn name(&self) -> &'static str {
        match self {
            OutputMode::PlainMap => "nvrmap",
            OutputMode::DetailedReport => "ensym_2017",
            OutputMode::LegacyReport => "ensym_2013",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nvrmap" => Some(OutputMode::PlainMap),
            "ensym_2017" => Some(OutputMode::DetailedReport),
            "ensym_2013" => Some(OutputMode::LegacyReport),
            _ => None,
        }
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            OutputMode::PlainMap => PLAIN_MAP_SCHEMA,
            OutputMode::DetailedReport => DETAILED_REPORT_SCHEMA,
            OutputMode::LegacyReport => LEGACY_REPORT_SCHEMA,
        }
    }

    /// Whether rows must carry a BCS rating
    ///
    /// LegacyReport is derived from DetailedReport, so it needs one too.
    pub fn needs_status(&self) -> bool {
        !matches!(self, OutputMode::PlainMap)
    }

    /// Output column names in order, geometry included
    pub fn column_names(&self) -> Vec<&'static str> {
        self.schema()
            .iter()
            .map(|f| f.name)
            .chain(std::iter::once(GEOMETRY_FIELD))
            .collect()
    }
}

/// Per-run values stamped onto every row
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub project: String,
    pub collector: String,
    pub habitat_score: f64,
    pub gain_score: f64,
    pub survey_date: NaiveDate,
}

fn numeric_date(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn build_column(
    field_spec: &FieldSpec,
    rows: &[ClassifiedRow],
    attribution: &Attribution,
    mode: OutputMode,
) -> Result<Column> {
    let n = rows.len();
    let name: PlSmallStr = field_spec.name.into();

    let column = match field_spec.role {
        FieldRole::SiteId => {
            let values: Vec<i32> = rows.iter().map(|r| r.site_id as i32).collect();
            Column::new(name, values)
        }
        FieldRole::ZoneId => {
            let values: Vec<&str> = rows.iter().map(|r| r.zone_id.as_str()).collect();
            Column::new(name, values)
        }
        FieldRole::CombinedCode => {
            let values: Vec<&str> = rows.iter().map(|r| r.combined_code.as_str()).collect();
            Column::new(name, values)
        }
        FieldRole::StatusCategory => {
            let values = rows
                .iter()
                .map(|r| {
                    r.status_category.as_deref().ok_or(NvrmapError::MissingField {
                        field: field_spec.name,
                        mode: mode.name(),
                    })
                })
                .collect::<Result<Vec<&str>>>()?;
            Column::new(name, values)
        }
        FieldRole::AreaHa => {
            let values: Vec<f64> = rows.iter().map(|r| r.area_ha).collect();
            Column::new(name, values)
        }
        FieldRole::ProjectId => Column::new(name, vec![attribution.project.as_str(); n]),
        FieldRole::Collector => Column::new(name, vec![attribution.collector.as_str(); n]),
        FieldRole::HabitatScore => Column::new(name, vec![attribution.habitat_score; n]),
        FieldRole::GainScore => Column::new(name, vec![attribution.gain_score; n]),
        FieldRole::SurveyDateNumeric => {
            Column::new(name, vec![numeric_date(attribution.survey_date); n])
        }
        FieldRole::SurveyDate => {
            Column::new(name, vec![days_since_epoch(attribution.survey_date); n])
                .cast(&DataType::Date)?
        }
        FieldRole::Zero => Column::new(name, vec![0i32; n]),
        FieldRole::Literal(value) => Column::new(name, vec![value; n]),
    };
    Ok(column)
}

/// Project classified rows onto the layout of `mode`
pub fn project(
    rows: &[ClassifiedRow],
    attribution: &Attribution,
    mode: OutputMode,
) -> Result<DataFrame> {
    let schema = mode.schema();
    let mut columns = Vec::with_capacity(schema.len() + 1);
    for field_spec in schema {
        columns.push(build_column(field_spec, rows, attribution, mode)?);
    }

    let geometry: Vec<String> = rows.iter().map(|r| to_wkt(&r.geometry)).collect();
    columns.push(Column::new(GEOMETRY_FIELD.into(), geometry));

    let df = DataFrame::new(columns)?;
    tracing::info!("Projected {} rows onto {} layout", df.height(), mode.name());
    Ok(df)
}

/// Turn a DetailedReport frame into a LegacyReport frame
///
/// Drops the combined code, BCS and long-term count, renames the gain score
/// and reorders. Values are untouched.
pub fn derive_legacy(detailed: &DataFrame) -> Result<DataFrame> {
    let present = detailed.get_column_names();
    for expected in OutputMode::DetailedReport.column_names() {
        if !present.iter().any(|name| name.as_str() == expected) {
            return Err(NvrmapError::MissingField {
                field: expected,
                mode: OutputMode::DetailedReport.name(),
            });
        }
    }

    let mut df = detailed.clone();
    df.rename(LEGACY_RENAMED.0, LEGACY_RENAMED.1.into())?;
    let legacy = df.select(OutputMode::LegacyReport.column_names())?;

    tracing::info!(
        "Changing to EnSym 2013 format (dropped {:?}, renamed {} -> {})",
        LEGACY_DROPPED,
        LEGACY_RENAMED.0,
        LEGACY_RENAMED.1
    );
    Ok(legacy)
}

//! Mapping Pipeline - main coordinator for one run
//!
//! parcel ids -> polygons (spatial engine) -> classified rows -> output layout
//!
//! Every call builds its own classification state, so a `Pipeline` can be
//! shared between concurrent requests.

use crate::benchmark::BenchmarkTable;
use crate::classify::{classify_rows, ZoneScheme};
use crate::config::Config;
use crate::data::{ExportPolygonSource, PolygonSource};
use crate::error::{NvrmapError, Result};
use crate::schema::{derive_legacy, project, Attribution, OutputMode};
use crate::writer::write_output;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::PathBuf;

/// Options for one run
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    /// Parcel view PFIs, or property view PFIs when `property_view` is set
    pub ids: Vec<String>,
    pub output: PathBuf,
    /// Overrides the configured gain score when set and non-zero
    pub gain_score: Option<f64>,
    pub property_view: bool,
    pub mode: OutputMode,
    pub zone_scheme: ZoneScheme,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            ids: Vec::new(),
            output: PathBuf::from("nvrmap"),
            gain_score: None,
            property_view: false,
            mode: OutputMode::PlainMap,
            zone_scheme: ZoneScheme::Bijective,
        }
    }
}

pub struct Pipeline {
    config: Config,
    source: Box<dyn PolygonSource>,
}

impl Pipeline {
    pub fn new(config: Config, source: Box<dyn PolygonSource>) -> Self {
        Self { config, source }
    }

    /// Pipeline reading the configured intersection export
    pub fn from_config(config: Config) -> Result<Self> {
        let source = ExportPolygonSource::new(
            config.polygon_data()?,
            config.sources.property_data.clone(),
        )?;
        Ok(Self::new(config, Box::new(source)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn attribution(&self, opts: &ProcessingOptions, survey_date: NaiveDate) -> Attribution {
        let attrs = &self.config.attribute_table;
        let gain_score = opts
            .gain_score
            .filter(|g| *g != 0.0)
            .unwrap_or(attrs.default_gain_score);

        Attribution {
            project: attrs.project.clone(),
            collector: attrs.collector.clone(),
            habitat_score: attrs.default_habitat_score,
            gain_score,
            survey_date,
        }
    }

    /// Ordered parcel ids defining the site numbering
    fn parcel_batch(&self, opts: &ProcessingOptions) -> Result<Vec<String>> {
        if opts.ids.is_empty() {
            return Err(NvrmapError::Config(
                "at least one PFI value is required".to_string(),
            ));
        }
        if !opts.property_view {
            return Ok(opts.ids.clone());
        }

        let parcels = self.source.parcels_for_properties(&opts.ids)?;
        if parcels.is_empty() {
            return Err(NvrmapError::NoResults);
        }
        Ok(parcels)
    }

    fn benchmark(&self, mode: OutputMode) -> Result<Option<BenchmarkTable>> {
        if !mode.needs_status() {
            return Ok(None);
        }
        let path = self.config.evc_data.as_deref().ok_or_else(|| {
            NvrmapError::Benchmark(format!("{} output needs evc_data configured", mode.name()))
        })?;
        BenchmarkTable::load(path).map(Some)
    }

    /// Build the output table with an explicit survey date
    pub fn build_output_on(
        &self,
        opts: &ProcessingOptions,
        survey_date: NaiveDate,
    ) -> Result<DataFrame> {
        let batch = self.parcel_batch(opts)?;

        let records = self.source.fetch_polygons(&batch)?;
        if records.is_empty() {
            return Err(NvrmapError::NoResults);
        }

        let benchmark = self.benchmark(opts.mode)?;
        tracing::info!("{} output format selected", opts.mode.name());

        let rows = classify_rows(&records, &batch, benchmark.as_ref(), opts.zone_scheme)?;
        let attribution = self.attribution(opts, survey_date);

        match opts.mode {
            OutputMode::PlainMap => project(&rows, &attribution, OutputMode::PlainMap),
            OutputMode::DetailedReport => {
                project(&rows, &attribution, OutputMode::DetailedReport)
            }
            OutputMode::LegacyReport => {
                let detailed = project(&rows, &attribution, OutputMode::DetailedReport)?;
                derive_legacy(&detailed)
            }
        }
    }

    /// Build the output table dated today
    pub fn build_output(&self, opts: &ProcessingOptions) -> Result<DataFrame> {
        self.build_output_on(opts, chrono::Local::now().date_naive())
    }

    /// Build and write the output, returning the table
    pub fn generate(&self, opts: &ProcessingOptions) -> Result<DataFrame> {
        let mut df = self.build_output(opts)?;
        write_output(&mut df, &opts.output, opts.mode)?;
        Ok(df)
    }
}

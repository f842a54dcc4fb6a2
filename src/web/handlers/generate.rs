//! ZIP generation endpoint
//!
//! Form fields:
//!   - pfis          ids separated by commas or whitespace, digits only
//!   - view_type     "property" for property PFIs, anything else is parcel view
//!   - output_format nvrmap | ensym_2017 | ensym_2013, anything else -> nvrmap
//!   - filename      download name without extension (default "output")
//!   - gainscore     optional float
//!
//! The output directory is written to a per-request temp dir and returned as
//! `<filename>.zip` holding `<filename>.csv` and `<filename>.schema.json`.

use crate::data::parse_pfi;
use crate::pipeline::ProcessingOptions;
use crate::schema::OutputMode;
use crate::web::{AppError, AppState};
use axum::{
    extract::{Form, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Default, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub pfis: String,
    pub view_type: Option<String>,
    pub output_format: Option<String>,
    pub filename: Option<String>,
    pub gainscore: Option<String>,
}

/// Validated request
#[derive(Debug)]
pub struct GenerateRequest {
    /// `output` is the bare directory name, placed under a temp dir per request
    pub options: ProcessingOptions,
    pub filename: String,
}

fn parse_ids(raw: &str) -> Result<Vec<String>, AppError> {
    let tokens: Vec<&str> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    if tokens.is_empty() {
        return Err(AppError::BadRequest("Please enter at least one PFI value".to_string()));
    }
    tokens
        .iter()
        .map(|token| {
            parse_pfi(token).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Invalid PFI value '{}': only digits are allowed",
                    token
                ))
            })
        })
        .collect()
}

fn parse_gain_score(raw: Option<&str>) -> Result<Option<f64>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid gain score '{}'", value))),
    }
}

/// Download name restricted to safe characters
fn sanitize_filename(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .trim()
        .trim_end_matches(".zip")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "output".to_string()
    } else {
        cleaned
    }
}

impl GenerateForm {
    pub fn validate(&self) -> Result<GenerateRequest, AppError> {
        let ids = parse_ids(&self.pfis)?;
        let property_view = self.view_type.as_deref().map(str::trim) == Some("property");

        let mode = self
            .output_format
            .as_deref()
            .and_then(OutputMode::from_name)
            .unwrap_or(OutputMode::PlainMap);

        let filename = sanitize_filename(self.filename.as_deref());

        Ok(GenerateRequest {
            options: ProcessingOptions {
                ids,
                output: PathBuf::from(&filename),
                gain_score: parse_gain_score(self.gainscore.as_deref())?,
                property_view,
                mode,
                ..ProcessingOptions::default()
            },
            filename,
        })
    }
}

fn internal(err: impl std::fmt::Display) -> AppError {
    AppError::Internal(err.to_string())
}

/// Zip every file of `dir`, in name order
fn zip_directory(dir: &Path) -> Result<Vec<u8>, AppError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(internal)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| internal(format!("unnamed output file {}", path.display())))?;
        archive.start_file(name, options).map_err(internal)?;
        archive.write_all(&fs::read(&path).map_err(internal)?).map_err(internal)?;
    }
    Ok(archive.finish().map_err(internal)?.into_inner())
}

pub async fn generate(
    State(state): State<AppState>,
    Form(form): Form<GenerateForm>,
) -> Result<Response, AppError> {
    let request = form.validate()?;
    tracing::info!(
        "Generating {} output for {} ids",
        request.options.mode.name(),
        request.options.ids.len()
    );

    // Polars and file work run off the async runtime
    let pipeline = state.pipeline.clone();
    let mut options = request.options;
    let body = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, AppError> {
        let workdir = tempfile::tempdir().map_err(internal)?;
        options.output = workdir.path().join(&options.output);
        pipeline.generate(&options)?;
        zip_directory(&options.output)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.zip\"", request.filename),
        ),
    ];
    Ok((headers, body).into_response())
}

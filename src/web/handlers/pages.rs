// Page handlers for HTML rendering with Askama

use crate::schema::OutputMode;
use axum::response::{Html, IntoResponse};
use askama::Template;

// ============================================================================
// Home Page
// ============================================================================

pub struct FormatOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub title: String,
    pub formats: Vec<FormatOption>,
    pub default_filename: &'static str,
}

fn format_label(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::PlainMap => "NVRMap",
        OutputMode::DetailedReport => "EnSym (2017)",
        OutputMode::LegacyReport => "EnSym (2013)",
    }
}

impl HomeTemplate {
    pub fn new() -> Self {
        let formats = [
            OutputMode::PlainMap,
            OutputMode::DetailedReport,
            OutputMode::LegacyReport,
        ]
        .into_iter()
        .map(|mode| FormatOption {
            value: mode.name(),
            label: format_label(mode),
        })
        .collect();

        Self {
            title: "NVRMap generator".to_string(),
            formats,
            default_filename: "output",
        }
    }
}

impl Default for HomeTemplate {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn home_page() -> impl IntoResponse {
    Html(HomeTemplate::new().render().unwrap_or_else(|e| {
        format!("Template error: {}", e)
    }))
}

//! Polygon geometry helpers
//!
//! The spatial engine delivers each dumped polygon as WKT text. Only single
//! `POLYGON` values occur after the dump step, so that is all this module
//! reads (through the `wkt` crate) and writes. Coordinates are planar metres
//! (GDA2020 / Vicgrid).

use crate::error::{NvrmapError, Result};
use geo::{Area, LineString, Polygon};
use wkt::TryFromWkt;

/// CRS of the intersection export and of every written output
pub const DEFAULT_CRS: &str = "EPSG:7899";

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// Parse a WKT (or EWKT with `SRID=...;` prefix) polygon
///
/// The first ring is the exterior, any following rings are holes.
/// Z and M ordinates are dropped. `POLYGON EMPTY` gives a polygon with no
/// rings and zero area.
pub fn parse_wkt_polygon(text: &str) -> Result<Polygon<f64>> {
    let text = text.trim();
    let text = match text.split_once(';') {
        Some((srid, rest)) if srid.trim().to_ascii_uppercase().starts_with("SRID=") => rest.trim(),
        _ => text,
    };

    let polygon = Polygon::<f64>::try_from_wkt_str(&text.to_ascii_uppercase())
        .map_err(|e| invalid(text, &e.to_string()))?;

    // Polygon::new closes rings, so a closed ring needs at least 4 positions
    let too_short = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .any(|ring| !ring.0.is_empty() && ring.0.len() < 4);
    if too_short {
        return Err(invalid(text, "ring needs at least 4 positions"));
    }
    Ok(polygon)
}

fn invalid(text: &str, reason: &str) -> NvrmapError {
    let preview: String = text.chars().take(60).collect();
    NvrmapError::Geometry(format!("{} in '{}'", reason, preview))
}

/// Format a polygon back to WKT
pub fn to_wkt(polygon: &Polygon<f64>) -> String {
    if polygon.exterior().0.is_empty() {
        return "POLYGON EMPTY".to_string();
    }
    let ring_text = |ring: &LineString<f64>| {
        let coords: Vec<String> = ring
            .coords()
            .map(|c| format!("{} {}", c.x, c.y))
            .collect();
        format!("({})", coords.join(", "))
    };

    let rings: Vec<String> = std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_text)
        .collect();
    format!("POLYGON ({})", rings.join(", "))
}

/// Planar area in hectares
pub fn area_hectares(polygon: &Polygon<f64>) -> f64 {
    polygon.unsigned_area() / SQUARE_METRES_PER_HECTARE
}

//! Site and zone classification
//!
//! Turns the ordered polygon sequence into numbered, lettered rows:
//! - `bioevc`: combined bioregion/EVC code
//! - `site`: parcel id -> 1-based site number
//! - `zone`: per-site counters and zone labels (A..Z, AA..)
//! - `classifier`: the sequential fold tying the three together

pub mod bioevc;
pub mod site;
pub mod zone;
pub mod classifier;

pub use bioevc::format_bioevc;
pub use site::{resolve_site_id, SiteIndex};
pub use zone::{zone_label, ZoneCounter, ZoneScheme};
pub use classifier::{classify_row, classify_rows, ClassificationState, ClassifiedRow};

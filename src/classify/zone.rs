//! Zone lettering
//!
//! Each site keeps its own counter. The counter is bumped before a label is
//! taken, so the first zone of every site is "A". Past "Z" the default scheme
//! continues like spreadsheet columns: AA, AB, ..., AZ, BA, ..., ZZ, AAA.
//!
//! `ZoneScheme::DoubledLetter` reproduces the older output where zone 27 is
//! "AA", 28 is "BB" up to "ZZ" at 52. It has no label past 52.

use crate::error::{NvrmapError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoneScheme {
    /// Bijective base-26
    #[default]
    Bijective,
    /// Legacy repeated-letter labels
    DoubledLetter,
}

impl ZoneScheme {
    pub fn name(&self) -> &'static str {
        match self {
            ZoneScheme::Bijective => "bijective",
            ZoneScheme::DoubledLetter => "doubled-letter",
        }
    }
}

fn letter(n: u32) -> char {
    // n in 1..=26
    char::from(b'A' + (n - 1) as u8)
}

/// Label for the `n`th zone of a site (1-based)
///
/// Zero never comes out of a pre-incremented counter and is rejected.
pub fn zone_label(n: u32, scheme: ZoneScheme) -> Result<String> {
    let undefined = || NvrmapError::ZoneIndex {
        value: n,
        scheme: scheme.name(),
    };

    match (n, scheme) {
        (0, _) => Err(undefined()),
        (1..=26, _) => Ok(letter(n).to_string()),
        (27..=52, ZoneScheme::DoubledLetter) => Ok(letter(n - 26).to_string().repeat(2)),
        (_, ZoneScheme::DoubledLetter) => Err(undefined()),
        (_, ZoneScheme::Bijective) => {
            let mut letters = Vec::new();
            let mut rest = n;
            while rest > 0 {
                let digit = (rest - 1) % 26;
                letters.push(char::from(b'A' + digit as u8));
                rest = (rest - 1) / 26;
            }
            Ok(letters.iter().rev().collect())
        }
    }
}

/// Per-site zone counters for one run
///
/// Counters start at zero and only ever go up.
#[derive(Debug, Clone)]
pub struct ZoneCounter {
    counts: Vec<u32>,
    scheme: ZoneScheme,
}

impl ZoneCounter {
    pub fn new(site_count: u32, scheme: ZoneScheme) -> Self {
        Self {
            counts: vec![0; site_count.max(1) as usize],
            scheme,
        }
    }

    /// Current count for a site (0 before its first zone)
    pub fn count(&self, site_id: u32) -> u32 {
        site_id
            .checked_sub(1)
            .and_then(|idx| self.counts.get(idx as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Bump the site's counter and return the new zone label
    pub fn next_zone_label(&mut self, site_id: u32) -> Result<String> {
        let idx = site_id.max(1) as usize - 1;
        if idx >= self.counts.len() {
            self.counts.resize(idx + 1, 0);
        }
        self.counts[idx] += 1;
        zone_label(self.counts[idx], self.scheme)
    }
}

//! Format-based filtering.

use super::Filter;
use crate::models::{Format, Listing};

/// Keeps listings in one of the allowed formats.
pub struct FormatFilter {
    allowed: Vec<Format>,
}

impl FormatFilter {
    pub fn new(allowed: Vec<Format>) -> Self {
        Self { allowed }
    }
}

impl Filter for FormatFilter {
    fn matches(&self, listing: &Listing) -> bool {
        self.allowed.contains(&listing.format)
    }

    fn description(&self) -> String {
        let names: Vec<&str> = self.allowed.iter().map(Format::as_str).collect();
        format!("Formats: {}", names.join(", "))
    }
}

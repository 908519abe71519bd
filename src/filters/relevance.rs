//! Word-level relevance re-check for loosely matching sources.

use super::Filter;
use crate::models::Listing;
use crate::query::QuerySpec;
use std::collections::BTreeSet;

/// Lower-cased word tokens of `text` (runs of letters, digits and `_`).
pub fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Keeps a listing only when every title word of the query appears in the
/// listing title and every author word in the listing author.
///
/// Query fields left empty constrain nothing.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    title: BTreeSet<String>,
    author: BTreeSet<String>,
}

impl RelevanceFilter {
    pub fn new(query: &QuerySpec) -> Self {
        Self {
            title: query.title().map(tokens).unwrap_or_default(),
            author: query.author().map(tokens).unwrap_or_default(),
        }
    }

    /// True when the query has no title or author words to check.
    pub fn is_trivial(&self) -> bool {
        self.title.is_empty() && self.author.is_empty()
    }
}

impl Filter for RelevanceFilter {
    fn matches(&self, listing: &Listing) -> bool {
        (self.title.is_empty() || self.title.is_subset(&tokens(&listing.title)))
            && (self.author.is_empty() || self.author.is_subset(&tokens(&listing.author)))
    }

    fn description(&self) -> String {
        let join = |words: &BTreeSet<String>| words.iter().cloned().collect::<Vec<_>>().join(" ");
        let mut parts = Vec::new();

        if !self.title.is_empty() {
            parts.push(format!("Title words: {}", join(&self.title)));
        }
        if !self.author.is_empty() {
            parts.push(format!("Author words: {}", join(&self.author)));
        }

        if parts.is_empty() { "Relevance: any".to_string() } else { parts.join("; ") }
    }
}

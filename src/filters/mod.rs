//! Listing filtering system with composable filters.

pub mod format;
pub mod relevance;

use crate::models::{ComparisonRow, Format, Listing};
use crate::query::QuerySpec;

pub use format::FormatFilter;
pub use relevance::RelevanceFilter;

/// Trait for filtering listings.
pub trait Filter: Send + Sync {
    /// Returns true if the listing passes the filter.
    fn matches(&self, listing: &Listing) -> bool;

    /// Returns a description of this filter.
    fn description(&self) -> String;
}

/// A chain of filters that must all pass.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Creates an empty filter chain.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FilterChainBuilder {
        FilterChainBuilder::new()
    }

    /// Adds a filter to the chain.
    pub fn add(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Checks if a listing passes all filters.
    pub fn matches(&self, listing: &Listing) -> bool {
        self.filters.iter().all(|f| f.matches(listing))
    }

    /// Filters a collection of listings.
    pub fn apply(&self, listings: Vec<Listing>) -> Vec<Listing> {
        listings.into_iter().filter(|l| self.matches(l)).collect()
    }

    /// Filters priced rows by their underlying listing.
    pub fn apply_rows(&self, rows: Vec<ComparisonRow>) -> Vec<ComparisonRow> {
        rows.into_iter().filter(|r| self.matches(&r.listing)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns descriptions of all filters.
    pub fn descriptions(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.description()).collect()
    }
}

/// Builder for constructing a FilterChain from command-line options.
#[derive(Default)]
pub struct FilterChainBuilder {
    chain: FilterChain,
}

impl FilterChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a title/author relevance check against `query`.
    pub fn relevance(mut self, query: &QuerySpec) -> Self {
        let filter = RelevanceFilter::new(query);
        if !filter.is_trivial() {
            self.chain.add(filter);
        }
        self
    }

    /// Keeps only the given formats. An empty list keeps everything.
    pub fn formats(mut self, formats: Vec<Format>) -> Self {
        if !formats.is_empty() {
            self.chain.add(FormatFilter::new(formats));
        }
        self
    }

    pub fn build(self) -> FilterChain {
        self.chain
    }
}

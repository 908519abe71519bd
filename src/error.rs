//! Error types for the source pipeline.
//!
//! Source-level errors knock out one source's contribution to a query;
//! listing-level errors drop a single listing. Neither aborts the search.

use std::time::Duration;
use thiserror::Error;

/// Failure of a whole source for one query.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure or non-2xx response.
    #[error("transport error: {0}")]
    Transport(String),

    /// Body could not be interpreted as the expected document type at all.
    #[error("parse error: {0}")]
    Parse(String),

    /// Fetch did not complete within the per-source timeout.
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Caller cancelled the search before the fetch completed.
    #[error("cancelled")]
    Cancelled,

    /// No adapter is registered under this id.
    #[error("unknown source: {0}")]
    UnknownSource(String),
}

/// Rejection of a single listing.
#[derive(Debug, Error, PartialEq)]
pub enum ListingError {
    /// A field the source always provides is missing or malformed.
    #[error("missing or malformed field `{field}`")]
    Normalization { field: String },

    /// The listing breaks an assumption the price comparison depends on.
    #[error("schema assumption violated: {0}")]
    SchemaViolation(String),
}

impl ListingError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Normalization { field: field.into() }
    }
}

/// Invalid search input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("at least one of author, title or keywords must be given")]
    Empty,
}

//! Source adapters, one per external book-data site.
//!
//! An adapter knows how to turn a [`QuerySpec`] into a request for its site
//! and how to read the site's result page back into [`RawListing`]s. It does
//! no I/O; fetching is the [`crate::client::Fetcher`]'s job.

pub mod abebooks;
pub mod annas_archive;
pub mod bibliocommons;
pub mod goodreads;
pub mod google_books;
pub mod indigo;
pub mod kobo;
pub mod registry;
pub mod selectors;

use crate::error::{ListingError, SourceError};
use crate::models::{RawListing, SourceId};
use crate::normalize::{collapse_whitespace, NormalizationTable};
use crate::query::QuerySpec;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use abebooks::AbeBooks;
pub use annas_archive::AnnasArchive;
pub use bibliocommons::BiblioCommons;
pub use goodreads::Goodreads;
pub use google_books::GoogleBooks;
pub use indigo::Indigo;
pub use kobo::Kobo;
pub use registry::AdapterRegistry;

/// What sort of site a source is. Drives the digest style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Marketplace,
    LibraryCatalog,
    Ratings,
    ShadowLibrary,
    Storefront,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Marketplace => "marketplace",
            SourceKind::LibraryCatalog => "library-catalog",
            SourceKind::Ratings => "ratings",
            SourceKind::ShadowLibrary => "shadow-library",
            SourceKind::Storefront => "storefront",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method of a request. Every site is searched with a plain GET.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
}

/// A fully composed request for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub source: SourceId,
    pub url: String,
    pub method: Method,
}

impl RequestDescriptor {
    pub fn get(source: SourceId, url: impl Into<String>) -> Self {
        Self { source, url: url.into(), method: Method::Get }
    }
}

/// Capability set every source implements.
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> &SourceId;

    fn kind(&self) -> SourceKind;

    /// Root URL requests are sent to.
    fn base_url(&self) -> &str;

    /// Builds the search request. Pure: the same query always yields the same
    /// descriptor. Query fields the site cannot express are ignored.
    fn compose_request(&self, query: &QuerySpec) -> RequestDescriptor;

    /// Extracts one raw record per result node (HTML) or result item (JSON),
    /// in document order.
    ///
    /// A response without the expected results yields an empty vector; only a
    /// body the adapter cannot read as its format at all is an error.
    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError>;

    /// Checks per-listing assumptions the price comparison depends on.
    fn validate(&self, _raw: &RawListing) -> Result<(), ListingError> {
        Ok(())
    }

    fn normalization(&self) -> &'static NormalizationTable;

    /// True for sites whose search matches loosely enough that results must
    /// be re-checked against the query words.
    fn needs_refilter(&self) -> bool {
        false
    }
}

/// Decodes a response body, rejecting anything that is not markup.
pub(crate) fn decode_body(body: &[u8]) -> Result<&str, SourceError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| SourceError::Parse(format!("body is not valid UTF-8: {}", e)))?;

    if !text.contains('<') {
        return Err(SourceError::Parse("body contains no markup".to_string()));
    }

    Ok(text)
}

/// Form-style encoding: like percent-encoding, but spaces become `+`.
pub(crate) fn quote_plus(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Whitespace-collapsed text content of an element.
pub(crate) fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Text of the first descendant matching `selector`, if any and non-blank.
pub(crate) fn select_text(element: ElementRef, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(element_text).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body_rejects_non_markup() {
        assert!(decode_body(b"<html></html>").is_ok());
        assert!(matches!(decode_body(b""), Err(SourceError::Parse(_))));
        assert!(matches!(decode_body(b"{\"json\": true}"), Err(SourceError::Parse(_))));
        assert!(matches!(decode_body(&[0xff, 0xfe, b'<']), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_quote_plus() {
        assert_eq!(quote_plus("blood meridian"), "blood+meridian");
        assert_eq!(quote_plus("title:(Dune)"), "title%3A%28Dune%29");
        assert_eq!(quote_plus("a&b"), "a%26b");
    }

    #[test]
    fn test_select_text() {
        let html = scraper::Html::parse_fragment("<div><span class='x'>  two\n words </span></div>");
        let selector = Selector::parse("span.x").unwrap();
        let missing = Selector::parse("span.y").unwrap();
        let root = html.root_element();
        assert_eq!(select_text(root, &selector).as_deref(), Some("two words"));
        assert!(select_text(root, &missing).is_none());
    }

    #[test]
    fn test_source_kind_display() {
        assert_eq!(SourceKind::LibraryCatalog.to_string(), "library-catalog");
        assert_eq!(SourceKind::ShadowLibrary.as_str(), "shadow-library");
    }
}

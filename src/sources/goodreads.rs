//! Goodreads book search, used for ratings only.

use super::selectors::goodreads as sel;
use super::{decode_body, quote_plus, select_text, RequestDescriptor, SourceAdapter, SourceKind};
use crate::error::SourceError;
use crate::models::{Format, RawListing, SourceId};
use crate::normalize::NormalizationTable;
use crate::query::QuerySpec;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::debug;

static MINIRATING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d\.\d\d) avg rating\D+([\d,]+) ratings?").unwrap());

static TABLE: NormalizationTable = NormalizationTable {
    title: &["title"],
    author: &["author"],
    format: &[],
    format_vocabulary: &[],
    format_when_absent: Format::Unknown,
    condition: &[],
    price: None,
    shipping: &[],
    seller_name: &[],
    seller_locality: &[],
    availability: &[],
    required: &["title"],
    extras: &[("avg_rating", "avg_rating"), ("num_ratings", "num_ratings"), ("link", "url")],
};

/// Ratings adapter.
pub struct Goodreads {
    id: SourceId,
    base_url: String,
}

impl Goodreads {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.goodreads.com";

    pub fn new() -> Self {
        Self { id: SourceId::new("goodreads"), base_url: Self::DEFAULT_BASE_URL.to_string() }
    }

    /// Overrides the site root (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_row(&self, row: ElementRef) -> RawListing {
        let mut raw = RawListing::new();

        let title_link = row.select(&sel::TITLE_LINK).next();
        raw.insert_opt("title", title_link.and_then(|a| select_text(a, &sel::TITLE)));
        raw.insert_opt("author", select_text(row, &sel::AUTHOR));

        if let Some((avg, count)) = select_text(row, &sel::MINIRATING).as_deref().and_then(parse_minirating) {
            raw.insert("avg_rating", avg);
            raw.insert("num_ratings", count);
        }

        if let Some(href) = title_link.and_then(|a| a.value().attr("href")) {
            raw.insert("link", format!("{}/{}", self.base_url, href.trim_start_matches('/')));
        }

        raw
    }
}

impl Default for Goodreads {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAdapter for Goodreads {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Ratings
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn compose_request(&self, query: &QuerySpec) -> RequestDescriptor {
        let url = format!(
            "{}/search?utf8=%E2%9C%93&q={}&search_type=books&search%5Bfield%5D=on",
            self.base_url,
            quote_plus(&query.free_text())
        );
        RequestDescriptor::get(self.id.clone(), url)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError> {
        let document = Html::parse_document(decode_body(body)?);

        let listings: Vec<RawListing> = document
            .select(&sel::ROW)
            .map(|row| self.parse_row(row))
            .filter(|raw| !raw.is_empty())
            .collect();

        debug!("Parsed {} goodreads rows", listings.len());
        Ok(listings)
    }

    fn normalization(&self) -> &'static NormalizationTable {
        &TABLE
    }

    fn needs_refilter(&self) -> bool {
        true
    }
}

/// "4.19 avg rating - 123,456 ratings" -> ("4.19", "123456").
fn parse_minirating(text: &str) -> Option<(String, String)> {
    let caps = MINIRATING.captures(text)?;
    let avg = caps.get(1)?.as_str().to_string();
    let count = caps.get(2)?.as_str().replace(',', "");
    Some((avg, count))
}

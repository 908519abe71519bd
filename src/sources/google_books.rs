//! Google Books volumes API, used for ratings and edition metadata.

use super::{quote_plus, RequestDescriptor, SourceAdapter, SourceKind};
use crate::error::SourceError;
use crate::models::{Format, RawListing, SourceId};
use crate::normalize::NormalizationTable;
use crate::query::QuerySpec;
use serde::Deserialize;
use tracing::debug;

static TABLE: NormalizationTable = NormalizationTable {
    title: &["title"],
    author: &["authors"],
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
    extras: &[
        ("avg_rating", "avg_rating"),
        ("num_ratings", "num_ratings"),
        ("publisher", "publisher"),
        ("published_year", "published_year"),
        ("page_count", "page_count"),
        ("language", "language"),
        ("isbn_13", "isbn_13"),
        ("isbn_10", "isbn_10"),
        ("link", "url"),
    ],
};

/// Page size requested from the API.
const MAX_RESULTS: u32 = 40;

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo", default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    page_count: Option<u64>,
    average_rating: Option<f64>,
    ratings_count: Option<u64>,
    language: Option<String>,
    canonical_volume_link: Option<String>,
    industry_identifiers: Vec<IndustryIdentifier>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

impl VolumeInfo {
    fn into_raw(self) -> RawListing {
        let mut raw = RawListing::new();

        // Subtitle words count toward the title for relevance
        let title = match (self.title, self.subtitle) {
            (Some(title), Some(subtitle)) if !subtitle.trim().is_empty() => Some(format!("{}: {}", title, subtitle)),
            (title, _) => title,
        };
        raw.insert_opt("title", title);

        if !self.authors.is_empty() {
            raw.insert("authors", self.authors.join("; "));
        }
        raw.insert_opt("publisher", self.publisher);
        raw.insert_opt("published_year", self.published_date.as_deref().and_then(publication_year));
        raw.insert_opt("page_count", self.page_count.map(|n| n.to_string()));
        raw.insert_opt("avg_rating", self.average_rating.map(|r| format!("{:.2}", r)));
        raw.insert_opt("num_ratings", self.ratings_count.map(|n| n.to_string()));
        raw.insert_opt("language", self.language);
        raw.insert_opt("link", self.canonical_volume_link);

        for id in self.industry_identifiers {
            match id.kind.as_str() {
                "ISBN_13" => raw.insert("isbn_13", id.identifier),
                "ISBN_10" => raw.insert("isbn_10", id.identifier),
                _ => {}
            }
        }

        raw
    }
}

/// `publishedDate` is `yyyy`, `yyyy-mm` or `yyyy-mm-dd`; only the year is kept.
fn publication_year(date: &str) -> Option<&str> {
    let year = date.get(..4)?;
    year.chars().all(|c| c.is_ascii_digit()).then_some(year)
}

/// Ratings adapter over the public volumes endpoint.
pub struct GoogleBooks {
    id: SourceId,
    base_url: String,
}

impl GoogleBooks {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.googleapis.com/books/v1";

    pub fn new() -> Self {
        Self { id: SourceId::new("google_books"), base_url: Self::DEFAULT_BASE_URL.to_string() }
    }

    /// Overrides the API root (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for GoogleBooks {
    fn default() -> Self {
        Self::new()
    }
}

/// `intitle:(..) inauthor:(..) inpublisher:(..) keywords`, absent parts omitted.
fn query_argument(query: &QuerySpec) -> String {
    let mut parts: Vec<String> = [("intitle", query.title()), ("inauthor", query.author()), ("inpublisher", query.publisher())]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| format!("{}:({})", field, v)))
        .collect();

    if let Some(keywords) = query.keywords() {
        parts.push(keywords.to_string());
    }

    parts.join(" ")
}

impl SourceAdapter for GoogleBooks {
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
        let mut url = format!(
            "{}/volumes?q={}&maxResults={}",
            self.base_url,
            quote_plus(&query_argument(query)),
            MAX_RESULTS
        );
        if let Some(language) = query.language() {
            url.push_str(&format!("&langRestrict={}", quote_plus(language)));
        }
        RequestDescriptor::get(self.id.clone(), url)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError> {
        let response: VolumesResponse = serde_json::from_slice(body)
            .map_err(|e| SourceError::Parse(format!("invalid volumes response: {}", e)))?;

        let listings: Vec<RawListing> = response
            .items
            .into_iter()
            .map(|volume| volume.volume_info.into_raw())
            .filter(|raw| !raw.is_empty())
            .collect();

        debug!("Parsed {} google books volumes", listings.len());
        Ok(listings)
    }

    fn normalization(&self) -> &'static NormalizationTable {
        &TABLE
    }

    fn needs_refilter(&self) -> bool {
        true
    }
}

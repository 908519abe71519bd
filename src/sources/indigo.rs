//! Indigo (Chapters) bookstore, Canadian prices.

use super::selectors::indigo as sel;
use super::{decode_body, element_text, quote_plus, select_text, RequestDescriptor, SourceAdapter, SourceKind};
use crate::error::SourceError;
use crate::models::{Format, RawListing, SourceId};
use crate::normalize::{NormalizationTable, PriceSpec};
use crate::query::QuerySpec;
use scraper::{ElementRef, Html};
use tracing::debug;

static TABLE: NormalizationTable = NormalizationTable {
    title: &["title"],
    author: &["author"],
    format: &["format"],
    format_vocabulary: &[
        ("audio", Format::Audiobook),
        ("ebook", Format::Ebook),
        ("hardcover", Format::Book),
        ("paperback", Format::Book),
        ("mass market", Format::Book),
        ("book", Format::Book),
    ],
    format_when_absent: Format::Book,
    condition: &[],
    price: Some(PriceSpec { amount: &["price"], currency: "currency", guaranteed_numeric: false }),
    shipping: &[],
    seller_name: &[],
    seller_locality: &[],
    availability: &["online_availability", "store_availability"],
    required: &["title"],
    extras: &[
        ("online_availability", "online_availability"),
        ("store_availability", "store_availability"),
        ("link", "url"),
    ],
};

pub struct Indigo {
    id: SourceId,
    base_url: String,
}

impl Indigo {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.chapters.indigo.ca";

    /// Indigo only sells in Canadian dollars.
    pub const CURRENCY: &'static str = "CAD";

    pub fn new() -> Self {
        Self { id: SourceId::new("indigo"), base_url: Self::DEFAULT_BASE_URL.to_string() }
    }

    /// Overrides the site root (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_item(&self, item: ElementRef) -> RawListing {
        let mut raw = RawListing::new();

        let title = item.select(&sel::TITLE).next();
        raw.insert_opt("title", title.map(element_text));
        raw.insert_opt("author", select_text(item, &sel::AUTHOR));
        raw.insert_opt("format", select_text(item, &sel::FORMAT));
        raw.insert_opt("price", select_text(item, &sel::PRICE));
        raw.insert("currency", Self::CURRENCY);
        raw.insert_opt("online_availability", select_text(item, &sel::ONLINE_AVAILABILITY));
        raw.insert_opt("store_availability", select_text(item, &sel::STORE_AVAILABILITY));

        let href = title
            .and_then(|t| t.select(&sel::LINK).next())
            .or_else(|| item.select(&sel::LINK).next())
            .and_then(|a| a.value().attr("href"));
        if let Some(href) = href {
            let link = if href.starts_with('/') { format!("{}{}", self.base_url, href) } else { href.to_string() };
            raw.insert("link", link);
        }

        raw
    }
}

impl Default for Indigo {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceAdapter for Indigo {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Storefront
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn compose_request(&self, query: &QuerySpec) -> RequestDescriptor {
        let url = format!("{}/en-ca/home/search/?keywords={}", self.base_url, quote_plus(&query.free_text()));
        RequestDescriptor::get(self.id.clone(), url)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError> {
        let document = Html::parse_document(decode_body(body)?);

        let listings: Vec<RawListing> = document
            .select(&sel::RESULT)
            .map(|item| self.parse_item(item))
            .filter(|raw| raw.contains("title"))
            .collect();

        debug!("Parsed {} indigo results", listings.len());
        Ok(listings)
    }

    fn normalization(&self) -> &'static NormalizationTable {
        &TABLE
    }

    fn needs_refilter(&self) -> bool {
        true
    }
}

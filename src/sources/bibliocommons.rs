//! BiblioCommons public library catalogs.
//!
//! Every library on the platform lives on its own subdomain
//! (`epl.bibliocommons.com`, `calgary.bibliocommons.com`, ...); one adapter
//! instance is registered per subdomain.

use super::selectors::bibliocommons as sel;
use super::{decode_body, quote_plus, select_text, RequestDescriptor, SourceAdapter, SourceKind};
use crate::error::SourceError;
use crate::models::{Format, RawListing, SourceId};
use crate::normalize::NormalizationTable;
use crate::query::QuerySpec;
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use tracing::debug;

/// Format codes requested from the catalog: print, e-book, audiobook.
const FORMAT_CODES: &str = "BK OR EBOOK OR AB";

static TABLE: NormalizationTable = NormalizationTable {
    title: &["title"],
    author: &["author"],
    format: &["true_format"],
    format_vocabulary: &[
        ("web-ebook", Format::WebEbook),
        ("audiobook", Format::Audiobook),
        ("ebook", Format::Ebook),
        ("large print", Format::Book),
        ("graphic novel", Format::Book),
        ("book", Format::Book),
    ],
    format_when_absent: Format::Unknown,
    condition: &[],
    price: None,
    shipping: &[],
    seller_name: &[],
    seller_locality: &[],
    availability: &["availability_status"],
    required: &["title"],
    extras: &[
        ("subtitle", "subtitle"),
        ("format_description", "format_label"),
        ("call_number", "call_number"),
        ("hold_counts", "holds"),
        ("eresource_link", "eresource"),
        ("item_href", "url"),
        ("manifestations", "manifestations"),
    ],
};

/// Library catalog adapter for one BiblioCommons subdomain.
pub struct BiblioCommons {
    id: SourceId,
    base_url: String,
}

impl BiblioCommons {
    pub fn new(subdomain: &str) -> Self {
        Self {
            id: SourceId::new(subdomain),
            base_url: format!("https://{}.bibliocommons.com", subdomain.to_lowercase()),
        }
    }

    /// Overrides the site root (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `title:(X) AND author:(Y) AND ... AND formatcode:(BK OR EBOOK OR AB)`.
    pub fn search_string(query: &QuerySpec) -> String {
        let fields = [
            ("title", query.title()),
            ("author", query.author()),
            ("anywhere", query.keywords()),
            ("publisher", query.publisher()),
            ("formatcode", Some(FORMAT_CODES)),
            ("isolanguage", query.language()),
        ];

        fields
            .iter()
            .filter_map(|(key, value)| value.map(|v| format!("{}:({})", key, v)))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn parse_result(&self, item: ElementRef) -> Vec<RawListing> {
        let title = select_text(item, &sel::TITLE);
        let subtitle = select_text(item, &sel::SUBTITLE);
        let author = select_text(item, &sel::AUTHOR);

        // One row per (title, format); later manifestations of a format only
        // bump the count on the first.
        let mut rows: Vec<RawListing> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for manifestation in item.select(&sel::MANIFESTATION) {
            let format_label = select_text(manifestation, &sel::FORMAT).unwrap_or_default();
            let call_number = select_text(manifestation, &sel::CALL_NUMBER);
            let true_format = true_format(&format_label, call_number.as_deref());

            if let Some(count) = counts.get_mut(&true_format) {
                *count += 1;
                continue;
            }
            counts.insert(true_format.clone(), 1);

            let mut raw = RawListing::new();
            raw.insert_opt("title", title.as_deref());
            raw.insert_opt("subtitle", subtitle.as_deref());
            raw.insert_opt("author", author.as_deref());
            raw.insert("format_description", &format_label);
            raw.insert("true_format", &true_format);
            raw.insert_opt("availability_status", select_text(manifestation, &sel::AVAILABILITY));
            raw.insert_opt("call_number", call_number);
            raw.insert_opt("hold_counts", select_text(manifestation, &sel::HOLD_COUNTS));
            raw.insert_opt("eresource_link", select_text(manifestation, &sel::ERESOURCE_LINK));

            if let Some(href) =
                manifestation.select(&sel::ITEM_LINK).next().and_then(|a| a.value().attr("href"))
            {
                let url = if href.starts_with('/') {
                    format!("{}{}", self.base_url, href)
                } else {
                    href.to_string()
                };
                raw.insert("item_href", url);
            }

            rows.push(raw);
        }

        for raw in rows.iter_mut() {
            let count = raw.get("true_format").and_then(|f| counts.get(f)).copied();
            if let Some(count) = count {
                raw.insert("manifestations", count.to_string());
            }
        }

        rows
    }
}

impl SourceAdapter for BiblioCommons {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::LibraryCatalog
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn compose_request(&self, query: &QuerySpec) -> RequestDescriptor {
        let url = format!(
            "{}/v2/search?query={}&searchType=bl",
            self.base_url,
            quote_plus(&Self::search_string(query))
        );
        RequestDescriptor::get(self.id.clone(), url)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError> {
        let document = Html::parse_document(decode_body(body)?);

        let listings: Vec<RawListing> =
            document.select(&sel::RESULT).flat_map(|item| self.parse_result(item)).collect();

        debug!("Parsed {} {} catalog rows", listings.len(), self.id);
        Ok(listings)
    }

    fn normalization(&self) -> &'static NormalizationTable {
        &TABLE
    }
}

/// Distinguishes web-only e-books and downloadable audiobooks from the
/// catalog's own format label.
fn true_format(label: &str, call_number: Option<&str>) -> String {
    if label == "eBook" && call_number == Some("Internet Access") {
        return "web-ebook".to_string();
    }

    match label.to_lowercase().as_str() {
        "downloadable audiobook" => "audiobook".to_string(),
        other => other.to_string(),
    }
}

//! Anna's Archive search index.

use super::selectors::annas_archive as sel;
use super::{decode_body, element_text, quote_plus, select_text, RequestDescriptor, SourceAdapter, SourceKind};
use crate::error::SourceError;
use crate::models::{Format, RawListing, SourceId};
use crate::normalize::NormalizationTable;
use crate::query::QuerySpec;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::debug;

static FILESIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\S+)MB").unwrap());
static LANGUAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.*?\[(.*?)\].*MB").unwrap());
static FILETYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+), \S+MB").unwrap());
static FILENAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""(.+)""#).unwrap());

static TABLE: NormalizationTable = NormalizationTable {
    title: &["title"],
    author: &["author"],
    format: &["filetype"],
    format_vocabulary: &[
        ("epub", Format::Ebook),
        ("pdf", Format::Ebook),
        ("mobi", Format::Ebook),
        ("azw3", Format::Ebook),
        ("fb2", Format::Ebook),
        ("djvu", Format::Ebook),
        ("lit", Format::Ebook),
        ("lrf", Format::Ebook),
        ("txt", Format::Ebook),
        ("rtf", Format::Ebook),
        ("doc", Format::Ebook),
        ("htm", Format::Ebook),
        ("mht", Format::Ebook),
        ("cbz", Format::Ebook),
        ("cbr", Format::Ebook),
        ("mp3", Format::Audiobook),
        ("m4b", Format::Audiobook),
    ],
    format_when_absent: Format::Ebook,
    condition: &[],
    price: None,
    shipping: &[],
    seller_name: &[],
    seller_locality: &[],
    availability: &[],
    required: &["title"],
    extras: &[
        ("publisher", "publisher"),
        ("filesize_mb", "filesize_mb"),
        ("language", "language"),
        ("filetype", "filetype"),
        ("filename", "filename"),
        ("link", "url"),
    ],
};

/// Shadow library adapter.
pub struct AnnasArchive {
    id: SourceId,
    base_url: String,
    include_partial_matches: bool,
}

impl AnnasArchive {
    pub const DEFAULT_BASE_URL: &'static str = "https://annas-archive.org";

    pub fn new(include_partial_matches: bool) -> Self {
        Self {
            id: SourceId::new("annas_archive"),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            include_partial_matches,
        }
    }

    /// Overrides the site root (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_item(&self, card: ElementRef) -> RawListing {
        let mut raw = RawListing::new();
        raw.insert_opt("title", select_text(card, &sel::TITLE));
        raw.insert_opt("author", select_text(card, &sel::AUTHOR));
        raw.insert_opt("publisher", select_text(card, &sel::PUBLISHER));

        if let Some(details) = select_text(card, &sel::DETAILS) {
            let details = FileDetails::parse(&details);
            raw.insert_opt("filesize_mb", details.filesize_mb);
            raw.insert_opt("language", details.language);
            raw.insert_opt("filetype", details.filetype);
            raw.insert_opt("filename", details.filename);
        }

        if let Some(href) = card.select(&sel::LINK).next().and_then(|a| a.value().attr("href")) {
            let link = if href.starts_with('/') { format!("{}{}", self.base_url, href) } else { href.to_string() };
            raw.insert("link", link);
        }

        raw
    }
}

impl SourceAdapter for AnnasArchive {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::ShadowLibrary
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn compose_request(&self, query: &QuerySpec) -> RequestDescriptor {
        let mut url = format!(
            "{}/search?q={}&content=book_any",
            self.base_url,
            quote_plus(&query.free_text())
        );

        if let Some(language) = query.language() {
            url.push_str("&lang=");
            url.push_str(&urlencoding::encode(language));
        }

        RequestDescriptor::get(self.id.clone(), url)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError> {
        // Result cards ship wrapped in HTML comments
        let uncommented = decode_body(body)?.replace("<!--", "").replace("-->", "");
        let document = Html::parse_document(&uncommented);

        let mut listings = Vec::new();
        for node in document.root_element().descendants() {
            let Some(element) = ElementRef::wrap(node) else {
                continue;
            };

            if !self.include_partial_matches && is_partial_match_banner(element) {
                debug!("Stopping at partial-match section after {} results", listings.len());
                break;
            }

            if sel::RESULT.matches(&element) {
                listings.push(self.parse_item(element));
            }
        }

        debug!("Parsed {} annas_archive results", listings.len());
        Ok(listings)
    }

    fn normalization(&self) -> &'static NormalizationTable {
        &TABLE
    }

    fn needs_refilter(&self) -> bool {
        true
    }
}

fn is_partial_match_banner(element: ElementRef) -> bool {
    sel::ITALIC.matches(&element) && element_text(element).to_lowercase().contains("partial match")
}

/// Fields of the one-line file description, each extracted independently.
#[derive(Debug, Default, PartialEq)]
struct FileDetails {
    filesize_mb: Option<String>,
    language: Option<String>,
    filetype: Option<String>,
    filename: Option<String>,
}

impl FileDetails {
    fn parse(text: &str) -> Self {
        Self {
            filesize_mb: capture(&FILESIZE, text)
                .map(|size| size.replace('<', ""))
                .filter(|size| size.parse::<f64>().is_ok()),
            language: capture(&LANGUAGE, text),
            filetype: capture(&FILETYPE, text).map(|t| t.to_lowercase()),
            filename: capture(&FILENAME, text),
        }
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

//! Kobo e-book store.

use super::selectors::kobo as sel;
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
    format_vocabulary: &[("audio", Format::Audiobook), ("ebook", Format::Ebook)],
    format_when_absent: Format::Ebook,
    condition: &[],
    price: Some(PriceSpec {
        amount: &["sale_price", "regular_price"],
        currency: "currency",
        guaranteed_numeric: false,
    }),
    shipping: &[],
    seller_name: &[],
    seller_locality: &[],
    availability: &[],
    required: &["title"],
    extras: &[
        ("subtitle", "subtitle"),
        ("regular_price", "regular_price"),
        ("sale_price", "sale_price"),
        ("link", "url"),
    ],
};

/// Storefront adapter for one Kobo locale.
pub struct Kobo {
    id: SourceId,
    base_url: String,
    store: String,
    currency: String,
}

impl Kobo {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.kobo.com";

    /// `store` is the locale path, e.g. `ca/en`; `currency` is what that
    /// store prices in.
    pub fn new(store: &str, currency: &str) -> Self {
        Self {
            id: SourceId::new("kobo"),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            store: store.trim_matches('/').to_string(),
            currency: currency.to_uppercase(),
        }
    }

    /// Overrides the site root (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_item(&self, item: ElementRef) -> RawListing {
        let mut raw = RawListing::new();

        let title_link = item.select(&sel::TITLE_LINK).next();
        raw.insert_opt("title", title_link.map(element_text));
        raw.insert_opt("subtitle", select_text(item, &sel::SUBTITLE));
        raw.insert_opt("author", select_text(item, &sel::AUTHOR));

        let current = select_text(item, &sel::PRICE).map(|p| price_text(&p));
        match select_text(item, &sel::WAS_PRICE).map(|p| price_text(&p)) {
            Some(was) => {
                raw.insert("regular_price", was);
                raw.insert_opt("sale_price", current);
            }
            None => raw.insert_opt("regular_price", current),
        }
        raw.insert("currency", &self.currency);

        let is_audiobook = item.select(&sel::AUDIOBOOK_BADGE).next().is_some()
            || title_link.and_then(|a| a.value().attr("href")).is_some_and(|h| h.contains("/audiobook/"));
        raw.insert("format", if is_audiobook { "audiobook" } else { "ebook" });

        if let Some(href) = title_link.and_then(|a| a.value().attr("href")) {
            let link = if href.starts_with('/') { format!("{}{}", self.base_url, href) } else { href.to_string() };
            raw.insert("link", link);
        }

        raw
    }
}

impl SourceAdapter for Kobo {
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
        let url =
            format!("{}/{}/search?query={}", self.base_url, self.store, quote_plus(&query.free_text()));
        RequestDescriptor::get(self.id.clone(), url)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError> {
        let document = Html::parse_document(decode_body(body)?);

        let listings: Vec<RawListing> =
            document.select(&sel::RESULT).map(|item| self.parse_item(item)).collect();

        debug!("Parsed {} kobo results", listings.len());
        Ok(listings)
    }

    fn normalization(&self) -> &'static NormalizationTable {
        &TABLE
    }

    fn needs_refilter(&self) -> bool {
        true
    }
}

/// "Free" titles are priced at zero; anything else is passed through.
fn price_text(text: &str) -> String {
    if text.trim().eq_ignore_ascii_case("free") {
        "0".to_string()
    } else {
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;

    fn make_item(title: &str, price: &str, was_price: Option<&str>) -> String {
        let was = was_price.map(|w| format!(r#"<span class="was-price">{}</span>"#, w)).unwrap_or_default();
        format!(
            r#"<li class="book">
                <h2 class="title"><a href="/ca/en/ebook/{slug}">{title}</a></h2>
                <p class="subtitle">A Novel</p>
                <span class="synopsis-text"><a class="contributor-name">Cormac McCarthy</a></span>
                <span class="price-value">{price}</span>{was}
            </li>"#,
            slug = title.to_lowercase().replace(' ', "-"),
        )
    }

    fn make_page(items: &[String]) -> String {
        format!("<html><body><ul class=\"result-items\">{}</ul></body></html>", items.join(""))
    }

    #[test]
    fn test_compose_request() {
        let query = QuerySpec::builder().title("Blood Meridian").author("McCarthy").build().unwrap();
        let request = Kobo::new("ca/en", "CAD").compose_request(&query);
        assert_eq!(request.url, "https://www.kobo.com/ca/en/search?query=McCarthy+Blood+Meridian");
    }

    #[test]
    fn test_parse_regular_and_sale_prices() {
        let html = make_page(&[
            make_item("Blood Meridian", "C$19.99", None),
            make_item("Suttree", "C$9.99", Some("C$21.99")),
        ]);

        let rows = Kobo::new("ca/en", "CAD").parse(html.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].get("title"), Some("Blood Meridian"));
        assert_eq!(rows[0].get("author"), Some("Cormac McCarthy"));
        assert_eq!(rows[0].get("regular_price"), Some("C$19.99"));
        assert!(!rows[0].contains("sale_price"));
        assert_eq!(rows[0].get("currency"), Some("CAD"));
        assert_eq!(rows[0].get("link"), Some("https://www.kobo.com/ca/en/ebook/blood-meridian"));

        assert_eq!(rows[1].get("regular_price"), Some("C$21.99"));
        assert_eq!(rows[1].get("sale_price"), Some("C$9.99"));
    }

    #[test]
    fn test_sale_price_wins_in_normalization() {
        let html = make_page(&[make_item("Suttree", "C$9.99", Some("C$21.99"))]);
        let adapter = Kobo::new("ca/en", "CAD");
        let rows = adapter.parse(html.as_bytes()).unwrap();

        let listing = adapter.normalization().normalize(&SourceId::new("kobo"), &rows[0]).unwrap();
        assert_eq!(listing.price, Money::new(9.99, "CAD"));
        assert_eq!(listing.format, Format::Ebook);
        assert_eq!(listing.extra("regular_price"), Some("C$21.99"));
    }

    #[test]
    fn test_free_title() {
        let html = make_page(&[make_item("Free Sampler", "Free", None)]);
        let rows = Kobo::new("ca/en", "CAD").parse(html.as_bytes()).unwrap();
        assert_eq!(rows[0].get("regular_price"), Some("0"));
    }

    #[test]
    fn test_missing_result_list() {
        let rows = Kobo::new("ca/en", "CAD").parse(b"<html><body></body></html>").unwrap();
        assert!(rows.is_empty());
    }
}

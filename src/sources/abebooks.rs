//! AbeBooks used-book marketplace.

use super::selectors::abebooks as sel;
use super::{decode_body, element_text, select_text, RequestDescriptor, SourceAdapter, SourceKind};
use crate::config::MarketplaceConfig;
use crate::error::{ListingError, SourceError};
use crate::models::{Format, RawListing, SourceId};
use crate::normalize::{NormalizationTable, PriceSpec};
use crate::query::{BindingHint, QuerySpec};
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, trace};

static CONDITION_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Condition:\s+(.*?)(\.|$)").unwrap());

static TABLE: NormalizationTable = NormalizationTable {
    title: &["name"],
    author: &["author"],
    format: &["bookFormat"],
    format_vocabulary: &[
        ("audio", Format::Audiobook),
        ("cover", Format::Book),
        ("paperback", Format::Book),
        ("bound", Format::Book),
        ("book", Format::Book),
    ],
    format_when_absent: Format::Book,
    condition: &["condition"],
    price: Some(PriceSpec { amount: &["price"], currency: "priceCurrency", guaranteed_numeric: true }),
    shipping: &["shipping_amount"],
    seller_name: &["seller_name"],
    seller_locality: &["seller_location"],
    availability: &["availability"],
    required: &["name", "price", "priceCurrency"],
    extras: &[
        ("about", "description"),
        ("bookFormat", "binding"),
        ("bookEdition", "edition"),
        ("isbn", "isbn"),
        ("publisher", "publisher"),
        ("datePublished", "year_published"),
        ("seller_city", "seller_city"),
        ("seller_region", "seller_region"),
        ("seller_country", "seller_country"),
        ("shipping_dest", "ship_to"),
        ("url", "url"),
    ],
};

/// Item condition filter sent with every search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCondition {
    Any,
    New,
    #[default]
    Used,
}

impl ItemCondition {
    /// AbeBooks' numeric facet code for this condition.
    fn code(&self) -> Option<&'static str> {
        match self {
            ItemCondition::Any => None,
            ItemCondition::New => Some("100121501"),
            ItemCondition::Used => Some("100121503"),
        }
    }
}

impl std::str::FromStr for ItemCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any" => Ok(ItemCondition::Any),
            "new" => Ok(ItemCondition::New),
            "used" => Ok(ItemCondition::Used),
            _ => Err(format!("Unknown condition: {}. Use: any, new, used", s)),
        }
    }
}

/// Marketplace adapter. Prices are sorted by total (price + shipping).
pub struct AbeBooks {
    id: SourceId,
    base_url: String,
    condition: ItemCondition,
    ship_to: String,
    currency: String,
    seller_ids: Vec<u64>,
}

impl AbeBooks {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.abebooks.com";

    pub fn new(settings: &MarketplaceConfig) -> Self {
        Self {
            id: SourceId::new("abebooks"),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            condition: settings.condition,
            ship_to: settings.ship_to.clone(),
            currency: settings.currency.to_uppercase(),
            seller_ids: settings.seller_ids.clone(),
        }
    }

    /// Overrides the site root (for testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn parse_listing(&self, item: ElementRef) -> RawListing {
        let mut raw = RawListing::new();

        for meta in item.select(&sel::META) {
            let attrs = meta.value();
            if let (Some(prop), Some(content)) = (attrs.attr("itemprop"), attrs.attr("content")) {
                raw.insert(prop, content);
            }
        }

        raw.insert_opt("shipping_dest", select_text(item, &sel::SHIPPING_DEST));
        if let Some(text) = select_text(item, &sel::SHIPPING_COST) {
            raw.insert_opt("shipping_amount", shipping_amount(&text));
            raw.insert("shipping_text", text);
        }

        if let Some(info) = item.select(&sel::SELLER_INFO).next() {
            let seller = parse_seller(info);
            raw.insert_opt("seller_name", seller.name);
            raw.insert_opt("seller_location", seller.location);
            raw.insert_opt("seller_city", seller.city);
            raw.insert_opt("seller_region", seller.region);
            raw.insert_opt("seller_country", seller.country);
        }

        let condition = raw
            .get("about")
            .and_then(condition_from_description)
            .or_else(|| raw.get("itemCondition").and_then(condition_from_schema));
        raw.insert_opt("condition", condition);

        if let Some(href) = item.select(&sel::TITLE_LINK).next().and_then(|a| a.value().attr("href")) {
            let url = if href.starts_with('/') { format!("{}{}", self.base_url, href) } else { href.to_string() };
            raw.insert("url", url);
        }

        raw
    }
}

impl SourceAdapter for AbeBooks {
    fn id(&self) -> &SourceId {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Marketplace
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn compose_request(&self, query: &QuerySpec) -> RequestDescriptor {
        let mut args: Vec<(&str, String)> = vec![
            ("cm_sp", "SearchF-_-Advs-_-Result".to_string()),
            ("sts", "t".to_string()),
            ("bx", "off".to_string()),
            ("ds", "100".to_string()),
        ];

        if let Some(code) = self.condition.code() {
            args.push(("n", code.to_string()));
        }

        args.push(("recentlyadded", "all".to_string()));
        args.push(("sortby", "17".to_string()));
        args.push(("xdesc", "off".to_string()));
        args.push(("xpod", "off".to_string()));

        let fields = [
            ("kn", query.keywords()),
            ("tn", query.title()),
            ("an", query.author()),
            ("pn", query.publisher()),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                args.push((key, urlencoding::encode(value).into_owned()));
            }
        }

        match query.binding() {
            Some(BindingHint::Hardcover) => args.push(("bi", "h".to_string())),
            Some(BindingHint::Softcover) => args.push(("bi", "s".to_string())),
            Some(BindingHint::Any) | None => {}
        }

        args.push(("pt", "book".to_string()));

        let mut url = format!(
            "{}/servlet/SearchResults?{}",
            self.base_url,
            args.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join("&")
        );

        if !self.seller_ids.is_empty() {
            let ids: Vec<String> = self.seller_ids.iter().map(u64::to_string).collect();
            url.push_str("&saction=allow&slist=");
            url.push_str(&ids.join("%2B"));
        }

        RequestDescriptor::get(self.id.clone(), url)
    }

    fn parse(&self, body: &[u8]) -> Result<Vec<RawListing>, SourceError> {
        let document = Html::parse_document(decode_body(body)?);

        let listings: Vec<RawListing> = document
            .select(&sel::LISTING)
            .map(|item| {
                let raw = self.parse_listing(item);
                trace!("Parsed listing: {:?}", raw.get("name"));
                raw
            })
            .collect();

        debug!("Parsed {} abebooks listings", listings.len());
        Ok(listings)
    }

    fn validate(&self, raw: &RawListing) -> Result<(), ListingError> {
        let dest = raw.get("shipping_dest").unwrap_or_default();
        if !dest.trim_end_matches('.').to_lowercase().ends_with(&self.ship_to.to_lowercase()) {
            return Err(ListingError::SchemaViolation(format!(
                "listing ships to `{}`, expected {}",
                dest, self.ship_to
            )));
        }

        if let Some(currency) = raw.get("priceCurrency") {
            if !currency.eq_ignore_ascii_case(&self.currency) {
                return Err(ListingError::SchemaViolation(format!(
                    "price currency {} is not {}",
                    currency, self.currency
                )));
            }
        }

        match raw.get("shipping_text") {
            Some(text) if text.to_lowercase().contains("free") => Ok(()),
            Some(text) if text.contains(currency_marker(&self.currency)) => Ok(()),
            Some(text) => Err(ListingError::SchemaViolation(format!(
                "shipping `{}` is not in {}",
                text, self.currency
            ))),
            None => Err(ListingError::SchemaViolation("shipping cost not shown".to_string())),
        }
    }

    fn normalization(&self) -> &'static NormalizationTable {
        &TABLE
    }
}

/// Price prefix the site uses for a currency in shipping text.
fn currency_marker(currency: &str) -> &str {
    match currency {
        "USD" => "US$",
        "CAD" => "C$",
        "GBP" => "£",
        "EUR" => "EUR",
        other => other,
    }
}

fn shipping_amount(text: &str) -> Option<String> {
    if text.to_lowercase().contains("free") {
        return Some("0".to_string());
    }

    // "US$ 4.50 Shipping" -> "4.50"
    let number: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if number.is_empty() {
        None
    } else {
        Some(number)
    }
}

#[derive(Debug, Default, PartialEq)]
struct SellerInfo {
    name: Option<String>,
    location: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

fn parse_seller(info: ElementRef) -> SellerInfo {
    let Some(name) = select_text(info, &sel::SELLER_LINK) else {
        return SellerInfo::default();
    };

    let text = element_text(info);
    let location = text.replacen(&name, "", 1).replace("Seller:", "");
    let location = location.trim().trim_matches(',').trim().to_string();

    let mut seller = split_location(&location);
    seller.name = Some(name);
    if !location.is_empty() {
        seller.location = Some(location);
    }
    seller
}

/// "City, Region, Country" / "City, Country" / "Country".
fn split_location(location: &str) -> SellerInfo {
    let parts: Vec<&str> = location.split(", ").collect();

    match parts.as_slice() {
        [""] => SellerInfo::default(),
        [city, region, country] => SellerInfo {
            city: Some(city.to_string()),
            region: Some(region.to_string()),
            country: Some(country.to_string()),
            ..Default::default()
        },
        [city, country] => SellerInfo {
            city: Some(city.to_string()),
            country: Some(country.to_string()),
            ..Default::default()
        },
        [.., country] => SellerInfo { country: Some(country.to_string()), ..Default::default() },
        [] => SellerInfo::default(),
    }
}

fn condition_from_description(about: &str) -> Option<String> {
    CONDITION_PHRASE
        .captures(about)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|c| !c.is_empty())
}

/// "https://schema.org/UsedCondition" -> "used".
fn condition_from_schema(item_condition: &str) -> Option<String> {
    let name = item_condition.rsplit('/').next().unwrap_or(item_condition);
    let name = name.trim_end_matches("Condition").trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

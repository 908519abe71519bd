//! Data models for raw and normalized listings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a registered source (e.g. `abebooks`, `epl`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Canonical format vocabulary. Every source's raw format text maps onto one
/// of these; anything unrecognised becomes [`Format::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Book,
    Ebook,
    Audiobook,
    WebEbook,
    Unknown,
}

impl Format {
    /// Reader preference order used when listing available formats.
    pub const PREFERENCE: [Format; 4] = [Format::Book, Format::Ebook, Format::Audiobook, Format::WebEbook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Book => "book",
            Format::Ebook => "ebook",
            Format::Audiobook => "audiobook",
            Format::WebEbook => "web-ebook",
            Format::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "book" => Ok(Format::Book),
            "ebook" => Ok(Format::Ebook),
            "audiobook" => Ok(Format::Audiobook),
            "web-ebook" => Ok(Format::WebEbook),
            "unknown" => Ok(Format::Unknown),
            _ => Err(format!("Unknown format: {}. Use: book, ebook, audiobook, web-ebook", s)),
        }
    }
}

/// Free-form record scraped from one result node. Keys are source-specific.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawListing(BTreeMap<String, String>);

impl RawListing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a trimmed value; blank values are not stored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.0.insert(key.into(), value.to_string());
        }
    }

    /// Stores an optional value.
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<impl AsRef<str>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the first present value among `keys`.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for RawListing {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut raw = RawListing::new();
        for (k, v) in iter {
            raw.insert(k, v);
        }
        raw
    }
}

/// A non-negative amount tagged with its ISO currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    /// Returns `None` for negative or non-finite amounts.
    pub fn new(amount: f64, currency: impl Into<String>) -> Option<Self> {
        if amount.is_finite() && amount >= 0.0 {
            Some(Self { amount, currency: currency.into().to_uppercase() })
        } else {
            None
        }
    }
}

/// Canonical, source-independent search result.
///
/// Never mutated after normalization; derived values live in [`ComparisonRow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub source: SourceId,
    pub title: String,
    pub author: String,
    pub format: Format,
    /// Lower-cased, trimmed condition text (empty when the source has none)
    pub condition: String,
    pub price: Option<Money>,
    /// Shipping cost in the price's currency
    pub shipping: Option<f64>,
    pub seller_name: Option<String>,
    pub seller_locality: Option<String>,
    pub availability: Option<String>,
    /// Source-specific fields (ratings, holds, file details, ...)
    pub extra: BTreeMap<String, String>,
}

impl Listing {
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// A listing priced in the home currency, ready for ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub listing: Listing,
    pub price_home: Option<f64>,
    pub shipping_home: Option<f64>,
    pub total_home: Option<f64>,
    pub is_local: bool,
    /// 1-based position within the view that ranked this row
    pub rank: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_lowercases() {
        let id = SourceId::new("AbeBooks");
        assert_eq!(id.as_str(), "abebooks");
        assert_eq!(id.to_string(), "abebooks");
        assert_eq!(SourceId::from("EPL"), SourceId::new("epl"));
    }

    #[test]
    fn test_format_roundtrip_names() {
        for format in Format::PREFERENCE {
            assert_eq!(format.as_str().parse::<Format>().unwrap(), format);
        }
        assert_eq!(serde_json::to_string(&Format::WebEbook).unwrap(), "\"web-ebook\"");
        assert!("scroll".parse::<Format>().is_err());
    }

    #[test]
    fn test_raw_listing_skips_blank_values() {
        let mut raw = RawListing::new();
        raw.insert("title", "  Blood Meridian  ");
        raw.insert("subtitle", "   ");
        raw.insert_opt("author", None::<&str>);

        assert_eq!(raw.get("title"), Some("Blood Meridian"));
        assert!(!raw.contains("subtitle"));
        assert!(!raw.contains("author"));
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn test_raw_listing_first_of() {
        let raw: RawListing = [("regular_price", "19.99")].into_iter().collect();
        assert_eq!(raw.first_of(&["sale_price", "regular_price"]), Some("19.99"));
        assert_eq!(raw.first_of(&["sale_price"]), None);
    }

    #[test]
    fn test_money_rejects_negative() {
        assert!(Money::new(-1.0, "USD").is_none());
        assert!(Money::new(f64::NAN, "USD").is_none());
        let money = Money::new(12.5, "usd").unwrap();
        assert_eq!(money.currency, "USD");
        assert_eq!(money.amount, 12.5);
    }
}

//! Declarative mapping from a source's raw records onto [`Listing`].
//!
//! Each adapter owns one static [`NormalizationTable`]. Adding a source means
//! adding a table, never touching the aggregation code.

use crate::error::ListingError;
use crate::models::{Format, Listing, Money, RawListing, SourceId};
use std::collections::BTreeMap;

/// Where a listing's price comes from.
#[derive(Debug, Clone, Copy)]
pub struct PriceSpec {
    /// Raw keys tried in order; the first present one is the price
    pub amount: &'static [&'static str],
    /// Raw key holding the ISO currency code
    pub currency: &'static str,
    /// The source only ever emits a number here, so a parse failure means the
    /// page structure changed
    pub guaranteed_numeric: bool,
}

/// Field-rename-and-coerce rules for one source.
///
/// Every field is a list of raw keys tried in order.
#[derive(Debug, Clone, Copy)]
pub struct NormalizationTable {
    pub title: &'static [&'static str],
    pub author: &'static [&'static str],
    pub format: &'static [&'static str],
    /// Substring rules applied to the lower-cased raw format, first match wins
    pub format_vocabulary: &'static [(&'static str, Format)],
    /// Format assumed when the record carries no format key at all
    pub format_when_absent: Format,
    pub condition: &'static [&'static str],
    pub price: Option<PriceSpec>,
    pub shipping: &'static [&'static str],
    pub seller_name: &'static [&'static str],
    pub seller_locality: &'static [&'static str],
    pub availability: &'static [&'static str],
    /// Keys whose absence means the listing is structurally broken
    pub required: &'static [&'static str],
    /// Raw key -> extra key
    pub extras: &'static [(&'static str, &'static str)],
}

impl NormalizationTable {
    /// Maps a raw format label onto the closed vocabulary.
    pub fn map_format(&self, raw: Option<&str>) -> Format {
        let Some(raw) = raw else {
            return self.format_when_absent;
        };

        let label = raw.trim().to_lowercase();
        self.format_vocabulary
            .iter()
            .find(|(pattern, _)| label.contains(pattern))
            .map(|(_, format)| *format)
            .unwrap_or(Format::Unknown)
    }

    /// Applies the table to one raw record.
    pub fn normalize(&self, source: &SourceId, raw: &RawListing) -> Result<Listing, ListingError> {
        if let Some(missing) = self.required.iter().find(|key| !raw.contains(key)) {
            return Err(ListingError::missing(*missing));
        }

        let price = match &self.price {
            Some(spec) => normalize_price(spec, raw)?,
            None => None,
        };

        let extra: BTreeMap<String, String> = self
            .extras
            .iter()
            .filter_map(|(from, to)| raw.get(from).map(|v| (to.to_string(), v.to_string())))
            .collect();

        Ok(Listing {
            source: source.clone(),
            title: raw.first_of(self.title).map(collapse_whitespace).unwrap_or_default(),
            author: raw.first_of(self.author).map(collapse_whitespace).unwrap_or_default(),
            format: self.map_format(raw.first_of(self.format)),
            condition: raw.first_of(self.condition).map(|c| c.trim().to_lowercase()).unwrap_or_default(),
            price,
            shipping: raw.first_of(self.shipping).and_then(parse_amount),
            seller_name: raw.first_of(self.seller_name).map(collapse_whitespace),
            seller_locality: raw.first_of(self.seller_locality).map(collapse_whitespace),
            availability: raw.first_of(self.availability).map(collapse_whitespace),
            extra,
        })
    }
}

fn normalize_price(spec: &PriceSpec, raw: &RawListing) -> Result<Option<Money>, ListingError> {
    let Some(text) = raw.first_of(spec.amount) else {
        return Ok(None);
    };

    let amount = match parse_amount(text) {
        Some(amount) => amount,
        None if spec.guaranteed_numeric => {
            return Err(ListingError::missing(spec.amount.first().copied().unwrap_or("price")))
        }
        None => return Ok(None),
    };

    let currency = raw.get(spec.currency).ok_or_else(|| ListingError::missing(spec.currency))?;
    Ok(Money::new(amount, currency))
}

/// Parses a price-like string ("US$ 1,234.50", "C$12.99", "15") into a
/// non-negative number. Anything else is `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    if text.trim_start().starts_with('-') {
        return None;
    }

    let cleaned: String =
        text.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();

    // US format: 1,234.56 -> 1234.56
    let normalized = cleaned.replace(',', "");
    let normalized = normalized.trim_matches('.');
    if normalized.is_empty() {
        return None;
    }

    normalized.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    static TABLE: NormalizationTable = NormalizationTable {
        title: &["name", "title"],
        author: &["author"],
        format: &["binding"],
        format_vocabulary: &[("audio", Format::Audiobook), ("cover", Format::Book)],
        format_when_absent: Format::Book,
        condition: &["condition"],
        price: Some(PriceSpec { amount: &["price"], currency: "currency", guaranteed_numeric: true }),
        shipping: &["shipping"],
        seller_name: &["seller"],
        seller_locality: &["location"],
        availability: &[],
        required: &["name"],
        extras: &[("isbn", "isbn")],
    };

    static LOOSE: NormalizationTable = NormalizationTable {
        title: &["title"],
        author: &["author"],
        format: &[],
        format_vocabulary: &[],
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
        required: &[],
        extras: &[],
    };

    fn make_raw(pairs: &[(&str, &str)]) -> RawListing {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_normalize_full_record() {
        let raw = make_raw(&[
            ("name", "Blood  Meridian"),
            ("author", "Cormac McCarthy"),
            ("binding", "Hardcover"),
            ("condition", " Very Good "),
            ("price", "15.00"),
            ("currency", "USD"),
            ("shipping", "US$ 4.50"),
            ("seller", "Some Books"),
            ("location", "Austin, TX, U.S.A."),
            ("isbn", "9780679728757"),
            ("ignored", "x"),
        ]);

        let listing = TABLE.normalize(&SourceId::new("abebooks"), &raw).unwrap();
        assert_eq!(listing.title, "Blood Meridian");
        assert_eq!(listing.format, Format::Book);
        assert_eq!(listing.condition, "very good");
        assert_eq!(listing.price, Money::new(15.0, "USD"));
        assert_eq!(listing.shipping, Some(4.5));
        assert_eq!(listing.seller_locality.as_deref(), Some("Austin, TX, U.S.A."));
        assert_eq!(listing.extra("isbn"), Some("9780679728757"));
        assert_eq!(listing.extra.len(), 1);
    }

    #[test]
    fn test_required_field_missing() {
        let raw = make_raw(&[("title", "Only a title key"), ("price", "3"), ("currency", "USD")]);
        let err = TABLE.normalize(&SourceId::new("abebooks"), &raw).unwrap_err();
        assert_eq!(err, ListingError::missing("name"));
    }

    #[test]
    fn test_guaranteed_numeric_price_failure_is_error() {
        let raw = make_raw(&[("name", "X"), ("price", "call for price"), ("currency", "USD")]);
        let err = TABLE.normalize(&SourceId::new("abebooks"), &raw).unwrap_err();
        assert_eq!(err, ListingError::missing("price"));
    }

    #[test]
    fn test_loose_price_failure_is_absent() {
        let raw = make_raw(&[("title", "X"), ("regular_price", "n/a"), ("currency", "CAD")]);
        let listing = LOOSE.normalize(&SourceId::new("kobo"), &raw).unwrap();
        assert!(listing.price.is_none());
    }

    #[test]
    fn test_price_fallback_keys() {
        let raw = make_raw(&[("title", "X"), ("regular_price", "C$19.99"), ("currency", "CAD")]);
        let listing = LOOSE.normalize(&SourceId::new("kobo"), &raw).unwrap();
        assert_eq!(listing.price, Money::new(19.99, "CAD"));

        let raw = make_raw(&[
            ("title", "X"),
            ("sale_price", "C$9.99"),
            ("regular_price", "C$19.99"),
            ("currency", "CAD"),
        ]);
        let listing = LOOSE.normalize(&SourceId::new("kobo"), &raw).unwrap();
        assert_eq!(listing.price, Money::new(9.99, "CAD"));
    }

    #[test]
    fn test_price_without_currency_is_error() {
        let raw = make_raw(&[("name", "X"), ("price", "10")]);
        let err = TABLE.normalize(&SourceId::new("abebooks"), &raw).unwrap_err();
        assert_eq!(err, ListingError::missing("currency"));
    }

    #[test]
    fn test_format_mapping() {
        assert_eq!(TABLE.map_format(None), Format::Book);
        assert_eq!(TABLE.map_format(Some("Softcover")), Format::Book);
        assert_eq!(TABLE.map_format(Some("AUDIO CD")), Format::Audiobook);
        assert_eq!(TABLE.map_format(Some("Vinyl")), Format::Unknown);
        assert_eq!(LOOSE.map_format(None), Format::Ebook);
        assert_eq!(LOOSE.map_format(Some("anything")), Format::Unknown);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("US$ 12.50"), Some(12.5));
        assert_eq!(parse_amount("C$1,234.99"), Some(1234.99));
        assert_eq!(parse_amount("15"), Some(15.0));
        assert_eq!(parse_amount("0"), Some(0.0));
        assert_eq!(parse_amount("Free"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("-5.00"), None);
        assert_eq!(parse_amount("1.2.3"), None);
    }
}

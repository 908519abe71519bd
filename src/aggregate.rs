//! Ranked views and one-line summaries over priced listings.

use crate::models::{ComparisonRow, Format, Listing};
use crate::pricing::PriceConverter;
use crate::search::{SearchReport, SourceOutcome};
use crate::sources::SourceKind;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Placeholder rendered for a source with nothing to report.
pub const EMPTY_DIGEST: &str = "--";

/// Shadow-library file types worth mentioning, in display order.
const PREFERRED_FILETYPES: [&str; 3] = ["epub", "pdf", "mobi"];

fn cmp_amount(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The cheapest row per (format, condition), groups ordered by that price.
///
/// Rows without a total are ignored. On a tie the row seen first wins.
pub fn cheapest_per_group(rows: &[ComparisonRow]) -> Vec<ComparisonRow> {
    let mut index: HashMap<(Format, &str), usize> = HashMap::new();
    let mut best: Vec<&ComparisonRow> = Vec::new();

    for row in rows.iter().filter(|r| r.total_home.is_some()) {
        let key = (row.listing.format, row.listing.condition.as_str());
        match index.get(&key) {
            Some(&i) => {
                if cmp_amount(row.total_home, best[i].total_home) == Ordering::Less {
                    best[i] = row;
                }
            }
            None => {
                index.insert(key, best.len());
                best.push(row);
            }
        }
    }

    let mut view: Vec<ComparisonRow> = best.into_iter().cloned().collect();
    view.sort_by(|a, b| cmp_amount(a.total_home, b.total_home));
    rank(view)
}

/// Every priced row, cheapest total first.
pub fn by_total(rows: &[ComparisonRow]) -> Vec<ComparisonRow> {
    let mut view = rows.to_vec();
    view.sort_by(|a, b| cmp_amount(a.total_home, b.total_home));
    rank(view)
}

fn rank(mut view: Vec<ComparisonRow>) -> Vec<ComparisonRow> {
    for (i, row) in view.iter_mut().enumerate() {
        row.rank = Some(i + 1);
    }
    view
}

/// A local listing under its short display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalOption {
    pub name: String,
    pub row: ComparisonRow,
}

/// Local rows only, cheapest first.
pub fn local_summary(rows: &[ComparisonRow], converter: &PriceConverter) -> Vec<LocalOption> {
    let mut options: Vec<LocalOption> = rows
        .iter()
        .filter(|row| row.is_local)
        .map(|row| {
            let name = match converter.local_seller(&row.listing) {
                Some(seller) => seller.alias.clone().unwrap_or_else(|| seller.name.clone()),
                None => display_seller_name(
                    row.listing.seller_name.as_deref().unwrap_or_default(),
                    row.listing.seller_locality.as_deref(),
                ),
            };
            LocalOption { name, row: row.clone() }
        })
        .collect();

    options.sort_by(|a, b| cmp_amount(a.row.price_home, b.row.price_home));
    for (i, option) in options.iter_mut().enumerate() {
        option.row.rank = Some(i + 1);
    }
    options
}

/// Seller name without the `* ` marker or a trailing locality qualifier,
/// either parenthesised or repeating the seller's locality.
pub fn display_seller_name(name: &str, locality: Option<&str>) -> String {
    let mut name = name.trim().trim_start_matches('*').trim();

    if name.ends_with(')') {
        if let Some(open) = name.rfind('(') {
            name = name[..open].trim_end();
        }
    }

    if let Some(locality) = locality.map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(stripped) = name.strip_suffix(locality) {
            name = stripped.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '-');
        }
    }

    name.to_string()
}

/// Distinct formats among `listings`, in reader preference order.
/// Unknown formats are not reported.
pub fn format_availability<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Vec<Format> {
    let present: Vec<Format> = listings.into_iter().map(|l| l.format).collect();
    Format::PREFERENCE.into_iter().filter(|f| present.contains(f)).collect()
}

/// One summary line per source, plus the local sellers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Digest {
    pub lines: Vec<DigestLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestLine {
    pub label: String,
    /// `None` renders as the placeholder
    pub summary: Option<String>,
}

impl fmt::Display for DigestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.summary.as_deref().unwrap_or(EMPTY_DIGEST))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.lines.iter().map(|l| l.to_string()).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Builds the digest for a search. Every attempted source gets a line, even
/// when it failed or found nothing; the `LOCAL` line follows the first
/// marketplace.
pub fn digest(report: &SearchReport, converter: &PriceConverter) -> Digest {
    let mut lines = Vec::new();
    let mut local_done = false;

    for outcome in &report.outcomes {
        lines.push(DigestLine { label: outcome.source.as_str().to_uppercase(), summary: summarize(outcome) });

        if outcome.kind == Some(SourceKind::Marketplace) && !local_done {
            local_done = true;
            lines.push(DigestLine { label: "LOCAL".to_string(), summary: local_digest(&report.rows(), converter) });
        }
    }

    Digest { lines }
}

/// Summary text for one source, `None` when it has nothing to show.
pub fn summarize(outcome: &SourceOutcome) -> Option<String> {
    if outcome.error.is_some() || outcome.rows.is_empty() {
        return None;
    }

    match outcome.kind? {
        SourceKind::Marketplace | SourceKind::Storefront => price_range(&outcome.rows),
        SourceKind::LibraryCatalog => {
            let formats = format_availability(outcome.rows.iter().map(|r| &r.listing));
            join_nonempty(formats.iter().map(Format::as_str))
        }
        SourceKind::ShadowLibrary => {
            let filetypes: Vec<String> =
                outcome.rows.iter().filter_map(|r| r.listing.extra("filetype")).map(str::to_lowercase).collect();
            join_nonempty(PREFERRED_FILETYPES.into_iter().filter(|ft| filetypes.iter().any(|f| f == ft)))
        }
        SourceKind::Ratings => most_rated(&outcome.rows),
    }
}

fn join_nonempty<'a>(parts: impl Iterator<Item = &'a str>) -> Option<String> {
    let parts: Vec<&str> = parts.collect();
    if parts.is_empty() { None } else { Some(parts.join(" | ")) }
}

/// `$min-max (count)` over home-currency prices, whole units.
fn price_range(rows: &[ComparisonRow]) -> Option<String> {
    let prices: Vec<f64> = rows.iter().filter_map(|r| r.price_home).collect();
    let min = prices.iter().copied().reduce(f64::min)?;
    let max = prices.iter().copied().reduce(f64::max)?;
    Some(format!("${:.0}-{:.0} ({})", min.round(), max.round(), prices.len()))
}

/// `avg (count)` of the listing with the most ratings.
fn most_rated(rows: &[ComparisonRow]) -> Option<String> {
    let mut best: Option<(u64, &str)> = None;

    for row in rows {
        let count = row.listing.extra("num_ratings").and_then(|c| c.replace(',', "").parse::<u64>().ok());
        let avg = row.listing.extra("avg_rating");
        if let (Some(count), Some(avg)) = (count, avg) {
            match best {
                Some((top, _)) if count <= top => {}
                _ => best = Some((count, avg)),
            }
        }
    }

    best.map(|(count, avg)| format!("{} ({})", avg, count))
}

/// `alias:$price | ...` over the local sellers, cheapest first.
fn local_digest(rows: &[ComparisonRow], converter: &PriceConverter) -> Option<String> {
    let entries: Vec<String> = local_summary(rows, converter)
        .into_iter()
        .filter_map(|option| option.row.price_home.map(|price| format!("{}:${:.0}", option.name, price.round())))
        .collect();

    if entries.is_empty() { None } else { Some(entries.join(" | ")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Money, SourceId};
    use crate::pricing::{ExchangeRates, LocalSeller};
    use crate::query::QuerySpec;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn make_listing(source: &str, format: Format, condition: &str, seller: Option<&str>) -> Listing {
        Listing {
            source: SourceId::new(source),
            title: "Blood Meridian".to_string(),
            author: "Cormac McCarthy".to_string(),
            format,
            condition: condition.to_string(),
            price: None,
            shipping: None,
            seller_name: seller.map(String::from),
            seller_locality: None,
            availability: None,
            extra: BTreeMap::new(),
        }
    }

    fn make_row(format: Format, condition: &str, total: Option<f64>) -> ComparisonRow {
        ComparisonRow {
            listing: make_listing("abebooks", format, condition, None),
            price_home: total,
            shipping_home: total.map(|_| 0.0),
            total_home: total,
            is_local: false,
            rank: None,
        }
    }

    fn make_converter() -> PriceConverter {
        PriceConverter::new(
            Arc::new(ExchangeRates::new("CAD").with_rate("USD", 1.35)),
            vec![
                LocalSeller::new("Edmonton Book Store", Some("edmonton"), true),
                LocalSeller::new("The Bookseller", Some("bookseller"), false),
            ],
            Some("Edmonton".to_string()),
        )
    }

    fn make_outcome(source: &str, kind: SourceKind, rows: Vec<ComparisonRow>) -> SourceOutcome {
        SourceOutcome {
            source: SourceId::new(source),
            kind: Some(kind),
            rows,
            rejected: 0,
            filtered: 0,
            error: None,
        }
    }

    #[test]
    fn test_cheapest_per_group_with_tie_break() {
        let mut first = make_row(Format::Book, "used", Some(10.0));
        first.listing.title = "first".to_string();
        let mut second = make_row(Format::Book, "used", Some(10.0));
        second.listing.title = "second".to_string();

        let rows = vec![
            make_row(Format::Book, "used", Some(12.0)),
            first,
            second,
            make_row(Format::Ebook, "new", Some(5.0)),
        ];

        let view = cheapest_per_group(&rows);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].total_home, Some(5.0));
        assert_eq!(view[0].listing.format, Format::Ebook);
        assert_eq!(view[0].rank, Some(1));
        assert_eq!(view[1].total_home, Some(10.0));
        assert_eq!(view[1].listing.title, "first");
        assert_eq!(view[1].rank, Some(2));
    }

    #[test]
    fn test_cheapest_per_group_skips_unpriced() {
        let rows = vec![make_row(Format::Book, "used", None), make_row(Format::Ebook, "", None)];
        assert!(cheapest_per_group(&rows).is_empty());
        assert!(cheapest_per_group(&[]).is_empty());
    }

    #[test]
    fn test_by_total_puts_unpriced_last() {
        let rows = vec![
            make_row(Format::Book, "used", None),
            make_row(Format::Book, "used", Some(20.0)),
            make_row(Format::Book, "used", Some(3.0)),
        ];
        let view = by_total(&rows);
        let totals: Vec<Option<f64>> = view.iter().map(|r| r.total_home).collect();
        assert_eq!(totals, vec![Some(3.0), Some(20.0), None]);
        assert_eq!(view[2].rank, Some(3));
    }

    #[test]
    fn test_display_seller_name() {
        assert_eq!(display_seller_name("* The Bookseller", None), "The Bookseller");
        assert_eq!(display_seller_name("Alhambra Books (Edmonton, AB)", None), "Alhambra Books");
        assert_eq!(
            display_seller_name("Mister-Seekers Books, Edmonton, AB, Canada", Some("Edmonton, AB, Canada")),
            "Mister-Seekers Books"
        );
        assert_eq!(display_seller_name("Plain Name", Some("Calgary")), "Plain Name");
    }

    #[test]
    fn test_local_summary() {
        let converter = make_converter();

        let mut alias = make_row(Format::Book, "used", Some(20.0));
        alias.listing.seller_name = Some("The Bookseller".to_string());
        alias.is_local = true;

        let mut city = make_row(Format::Book, "used", Some(8.0));
        city.listing.seller_name = Some("* Whyte Ave Books (Edmonton)".to_string());
        city.is_local = true;

        let remote = make_row(Format::Book, "used", Some(1.0));

        let summary = local_summary(&[alias, remote, city], &converter);
        let names: Vec<&str> = summary.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Whyte Ave Books", "bookseller"]);
        assert_eq!(summary[0].row.rank, Some(1));
    }

    #[test]
    fn test_format_availability() {
        let listings = vec![
            make_listing("epl", Format::WebEbook, "", None),
            make_listing("epl", Format::Unknown, "", None),
            make_listing("epl", Format::Book, "", None),
            make_listing("epl", Format::Book, "", None),
            make_listing("epl", Format::Audiobook, "", None),
        ];
        assert_eq!(format_availability(&listings), vec![Format::Book, Format::Audiobook, Format::WebEbook]);
        assert!(format_availability(&[]).is_empty());
    }

    #[test]
    fn test_summarize_styles() {
        let market = make_outcome(
            "abebooks",
            SourceKind::Marketplace,
            vec![make_row(Format::Book, "used", Some(13.5)), make_row(Format::Book, "used", Some(27.2))],
        );
        assert_eq!(summarize(&market).as_deref(), Some("$14-27 (2)"));

        let mut library_rows = vec![make_row(Format::Audiobook, "", None), make_row(Format::Book, "", None)];
        library_rows[0].listing.source = SourceId::new("epl");
        let library = make_outcome("epl", SourceKind::LibraryCatalog, library_rows);
        assert_eq!(summarize(&library).as_deref(), Some("book | audiobook"));

        let mut shadow_rows = vec![make_row(Format::Ebook, "", None), make_row(Format::Ebook, "", None)];
        shadow_rows[0].listing.extra.insert("filetype".to_string(), "PDF".to_string());
        shadow_rows[1].listing.extra.insert("filetype".to_string(), "epub".to_string());
        let shadow = make_outcome("annas_archive", SourceKind::ShadowLibrary, shadow_rows);
        assert_eq!(summarize(&shadow).as_deref(), Some("epub | pdf"));

        let mut rating_rows = vec![make_row(Format::Unknown, "", None), make_row(Format::Unknown, "", None)];
        rating_rows[0].listing.extra.insert("avg_rating".to_string(), "3.90".to_string());
        rating_rows[0].listing.extra.insert("num_ratings".to_string(), "120".to_string());
        rating_rows[1].listing.extra.insert("avg_rating".to_string(), "4.19".to_string());
        rating_rows[1].listing.extra.insert("num_ratings".to_string(), "123456".to_string());
        let ratings = make_outcome("goodreads", SourceKind::Ratings, rating_rows);
        assert_eq!(summarize(&ratings).as_deref(), Some("4.19 (123456)"));
    }

    #[test]
    fn test_summarize_shadow_without_preferred_types() {
        let mut rows = vec![make_row(Format::Ebook, "", None)];
        rows[0].listing.extra.insert("filetype".to_string(), "djvu".to_string());
        assert!(summarize(&make_outcome("annas_archive", SourceKind::ShadowLibrary, rows)).is_none());
    }

    #[test]
    fn test_digest_keeps_every_source_visible() {
        let converter = make_converter();

        let mut local = make_row(Format::Book, "used", Some(12.0));
        local.listing.seller_name = Some("Edmonton Book Store".to_string());
        local.listing.price = Money::new(12.0, "USD");
        local.is_local = true;

        let mut degraded = make_outcome("kobo", SourceKind::Storefront, Vec::new());
        degraded.error = Some(crate::error::SourceError::Transport("status 503".to_string()));

        let report = SearchReport {
            query: QuerySpec::builder().title("Blood Meridian").build().unwrap(),
            outcomes: vec![
                make_outcome("abebooks", SourceKind::Marketplace, vec![local, make_row(Format::Book, "used", Some(20.4))]),
                degraded,
                make_outcome("epl", SourceKind::LibraryCatalog, Vec::new()),
            ],
        };

        let rendered = digest(&report, &converter).to_string();
        assert_eq!(rendered, "ABEBOOKS: $12-20 (2)\nLOCAL: edmonton:$12\nKOBO: --\nEPL: --");
    }

    #[test]
    fn test_digest_local_placeholder() {
        let report = SearchReport {
            query: QuerySpec::builder().title("Suttree").build().unwrap(),
            outcomes: vec![make_outcome("abebooks", SourceKind::Marketplace, Vec::new())],
        };
        let digest = digest(&report, &make_converter());
        assert_eq!(digest.lines.len(), 2);
        assert_eq!(digest.lines[1].to_string(), "LOCAL: --");
    }
}

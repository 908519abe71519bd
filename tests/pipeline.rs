//! Integration tests for the per-source pipeline using fixture files.

use book_scout::aggregate;
use book_scout::config::{Config, MarketplaceConfig};
use book_scout::error::SourceError;
use book_scout::models::Format;
use book_scout::pricing::{ExchangeRates, PriceConverter};
use book_scout::query::QuerySpec;
use book_scout::search::process_body;
use book_scout::sources::{AbeBooks, AnnasArchive, BiblioCommons, Goodreads, GoogleBooks, Indigo, Kobo, SourceAdapter, SourceKind};
use std::sync::Arc;

const ABEBOOKS_FIXTURE: &str = include_str!("fixtures/abebooks_blood_meridian.html");
const BIBLIOCOMMONS_FIXTURE: &str = include_str!("fixtures/bibliocommons_blood_meridian.html");
const GOODREADS_FIXTURE: &str = include_str!("fixtures/goodreads_blood_meridian.html");
const KOBO_FIXTURE: &str = include_str!("fixtures/kobo_blood_meridian.html");
const ANNAS_ARCHIVE_FIXTURE: &str = include_str!("fixtures/annas_archive_blood_meridian.html");
const GOOGLE_BOOKS_FIXTURE: &str = include_str!("fixtures/google_books_blood_meridian.json");
const INDIGO_FIXTURE: &str = include_str!("fixtures/indigo_blood_meridian.html");
const EMPTY_FIXTURE: &str = include_str!("fixtures/empty_results.html");
const EMPTY_VOLUMES: &str = r#"{"kind": "books#volumes", "totalItems": 0}"#;

fn make_query() -> QuerySpec {
    QuerySpec::builder().author("Cormac McCarthy").title("Blood Meridian").build().unwrap()
}

fn make_converter() -> PriceConverter {
    let rates = ExchangeRates::new("CAD").with_rate("USD", 1.35);
    PriceConverter::from_config(&Config::default(), Arc::new(rates))
}

fn make_adapters() -> Vec<(Box<dyn SourceAdapter>, &'static str)> {
    vec![
        (Box::new(AbeBooks::new(&MarketplaceConfig::default())), ABEBOOKS_FIXTURE),
        (Box::new(BiblioCommons::new("epl")), BIBLIOCOMMONS_FIXTURE),
        (Box::new(Goodreads::new()), GOODREADS_FIXTURE),
        (Box::new(Kobo::new("ca/en", "CAD")), KOBO_FIXTURE),
        (Box::new(AnnasArchive::new(false)), ANNAS_ARCHIVE_FIXTURE),
        (Box::new(GoogleBooks::new()), GOOGLE_BOOKS_FIXTURE),
        (Box::new(Indigo::new()), INDIGO_FIXTURE),
    ]
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.unwrap();
    assert!((actual - expected).abs() < 1e-6, "expected {}, got {}", expected, actual);
}

#[test]
fn test_blood_meridian_marketplace() {
    let adapter = AbeBooks::new(&MarketplaceConfig::default());
    let processed = process_body(&adapter, &make_query(), &make_converter(), ABEBOOKS_FIXTURE.as_bytes()).unwrap();

    // The listing that only ships to the U.S.A. is rejected
    assert_eq!(processed.rows.len(), 4);
    assert_eq!(processed.rejected, 1);

    let ranked = aggregate::by_total(&processed.rows);

    // Local seller: USD tag ignored, pickup instead of shipping
    let local = &ranked[0];
    assert_eq!(local.listing.seller_name.as_deref(), Some("Edmonton Book Store"));
    assert!(local.is_local);
    assert_close(local.price_home, 12.0);
    assert_close(local.shipping_home, 0.0);
    assert_close(local.total_home, 12.0);

    // Free shipping on a non-local listing
    assert!(!ranked[1].is_local);
    assert_close(ranked[1].price_home, 20.25);
    assert_close(ranked[1].shipping_home, 0.0);
    assert_close(ranked[1].total_home, 20.25);

    assert_close(ranked[2].price_home, 13.5);
    assert_close(ranked[2].shipping_home, 8.1);
    assert_close(ranked[2].total_home, 21.6);

    assert_close(ranked[3].total_home, 32.4);
    assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![Some(1), Some(2), Some(3), Some(4)]);

    // The local row is the cheapest overall, so it heads the per-group table
    let groups = aggregate::cheapest_per_group(&processed.rows);
    assert_eq!(groups[0].listing.seller_name.as_deref(), Some("Edmonton Book Store"));
    assert_eq!(groups[0].rank, Some(1));
    assert_close(groups[0].total_home, 12.0);
    assert!(groups.windows(2).all(|w| w[0].total_home <= w[1].total_home));

    let local_options = aggregate::local_summary(&processed.rows, &make_converter());
    assert_eq!(local_options.len(), 1);
    assert_eq!(local_options[0].name, "edmonton");
}

#[test]
fn test_converted_amounts_are_non_negative() {
    let converter = make_converter();

    for (adapter, fixture) in make_adapters() {
        let processed = process_body(adapter.as_ref(), &make_query(), &converter, fixture.as_bytes()).unwrap();
        for row in &processed.rows {
            for amount in [row.price_home, row.shipping_home, row.total_home].into_iter().flatten() {
                assert!(amount >= 0.0, "{}: negative amount {}", adapter.id(), amount);
            }
            // Unpriced listings stay unpriced
            if row.listing.price.is_none() {
                assert!(row.price_home.is_none());
                assert!(row.total_home.is_none());
            }
        }
    }
}

#[test]
fn test_every_listing_gets_a_format() {
    let converter = make_converter();

    for (adapter, fixture) in make_adapters() {
        let processed = process_body(adapter.as_ref(), &make_query(), &converter, fixture.as_bytes()).unwrap();
        assert!(!processed.rows.is_empty(), "{} produced no rows", adapter.id());

        // Rating sites carry no format information
        if adapter.kind() == SourceKind::Ratings {
            continue;
        }
        for row in &processed.rows {
            assert_ne!(row.listing.format, Format::Unknown, "{}: {}", adapter.id(), row.listing.title);
        }
    }
}

#[test]
fn test_library_formats() {
    let adapter = BiblioCommons::new("epl");
    let processed =
        process_body(&adapter, &make_query(), &make_converter(), BIBLIOCOMMONS_FIXTURE.as_bytes()).unwrap();

    let formats = aggregate::format_availability(processed.rows.iter().map(|r| &r.listing));
    assert_eq!(formats, vec![Format::Book, Format::Ebook, Format::Audiobook, Format::WebEbook]);
    assert_eq!(processed.rows.len(), 4);
}

#[test]
fn test_storefront_prefers_sale_price() {
    let adapter = Kobo::new("ca/en", "CAD");
    let processed = process_body(&adapter, &make_query(), &make_converter(), KOBO_FIXTURE.as_bytes()).unwrap();

    // "The Road" is not what was asked for
    assert_eq!(processed.rows.len(), 2);
    assert_eq!(processed.filtered, 1);

    let ebook = processed.rows.iter().find(|r| r.listing.format == Format::Ebook).unwrap();
    assert_close(ebook.price_home, 12.99);

    let audiobook = processed.rows.iter().find(|r| r.listing.format == Format::Audiobook).unwrap();
    assert_close(audiobook.price_home, 31.5);
}

#[test]
fn test_ratings_refilter_drops_study_guides() {
    let adapter = Goodreads::new();
    let processed = process_body(&adapter, &make_query(), &make_converter(), GOODREADS_FIXTURE.as_bytes()).unwrap();

    assert_eq!(processed.rows.len(), 2);
    assert_eq!(processed.filtered, 1);
    assert!(processed.rows.iter().all(|r| r.listing.author == "Cormac McCarthy"));
}

#[test]
fn test_ratings_api_refilter_and_editions() {
    let adapter = GoogleBooks::new();
    let processed =
        process_body(&adapter, &make_query(), &make_converter(), GOOGLE_BOOKS_FIXTURE.as_bytes()).unwrap();

    // The study guide is by someone else
    assert_eq!(processed.rows.len(), 2);
    assert_eq!(processed.filtered, 1);
    assert!(processed.rows.iter().all(|r| r.price_home.is_none()));

    let first = &processed.rows[0].listing;
    assert_eq!(first.title, "Blood Meridian: Or the Evening Redness in the West");
    assert_eq!(first.extra("avg_rating"), Some("4.00"));
    assert_eq!(first.extra("num_ratings"), Some("1311"));
    assert_eq!(first.extra("isbn_13"), Some("9780679728757"));
    assert_eq!(processed.rows[1].listing.extra("published_year"), Some("1985"));
}

#[test]
fn test_ratings_api_rejects_html_error_page() {
    let err = GoogleBooks::new().parse(EMPTY_FIXTURE.as_bytes()).unwrap_err();
    assert!(matches!(err, SourceError::Parse(_)));
}

#[test]
fn test_bookstore_formats_and_prices() {
    let adapter = Indigo::new();
    let processed = process_body(&adapter, &make_query(), &make_converter(), INDIGO_FIXTURE.as_bytes()).unwrap();

    // The gift card sits outside the results; "The Road" is not what was asked for
    assert_eq!(processed.rows.len(), 2);
    assert_eq!(processed.filtered, 1);

    let paperback = processed.rows.iter().find(|r| r.listing.format == Format::Book).unwrap();
    assert_close(paperback.price_home, 24.0);
    assert_eq!(paperback.listing.availability.as_deref(), Some("Ships within 1-2 business days"));
    assert_eq!(paperback.listing.extra("store_availability"), Some("Available at 4 stores"));

    let ebook = processed.rows.iter().find(|r| r.listing.format == Format::Ebook).unwrap();
    assert_close(ebook.price_home, 13.99);
    assert_close(ebook.total_home, 13.99);
}

#[test]
fn test_empty_response_yields_no_rows() {
    let converter = make_converter();

    for (adapter, _) in make_adapters() {
        let empty = if adapter.id().as_str() == "google_books" { EMPTY_VOLUMES } else { EMPTY_FIXTURE };
        assert!(adapter.parse(empty.as_bytes()).unwrap().is_empty(), "{}", adapter.id());

        let processed = process_body(adapter.as_ref(), &make_query(), &converter, empty.as_bytes()).unwrap();
        assert!(processed.rows.is_empty());
        assert_eq!(processed.rejected, 0);
    }
}

#[test]
fn test_commented_results_parse_like_visible_ones() {
    let adapter = AnnasArchive::new(false);
    let uncommented = ANNAS_ARCHIVE_FIXTURE.replace("<!--", "").replace("-->", "");

    let hidden = adapter.parse(ANNAS_ARCHIVE_FIXTURE.as_bytes()).unwrap();
    let visible = adapter.parse(uncommented.as_bytes()).unwrap();

    assert_eq!(hidden, visible);
    assert_eq!(hidden.len(), 2);
    assert_eq!(hidden[1].get("filetype"), Some("pdf"));
}

#[test]
fn test_partial_matches_are_opt_in() {
    let strict = AnnasArchive::new(false).parse(ANNAS_ARCHIVE_FIXTURE.as_bytes()).unwrap();
    let loose = AnnasArchive::new(true).parse(ANNAS_ARCHIVE_FIXTURE.as_bytes()).unwrap();

    assert_eq!(strict.len(), 2);
    assert_eq!(loose.len(), 3);
    assert_eq!(loose[2].get("filetype"), Some("mobi"));

    // The partial match is still dropped by the relevance re-check
    let processed = process_body(
        &AnnasArchive::new(true),
        &make_query(),
        &make_converter(),
        ANNAS_ARCHIVE_FIXTURE.as_bytes(),
    )
    .unwrap();
    assert_eq!(processed.rows.len(), 2);
    assert_eq!(processed.filtered, 1);
}

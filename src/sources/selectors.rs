//! CSS selectors for every supported site.
//!
//! Sites change their markup without notice. When a parser starts returning
//! nothing, capture the page, update the selectors here and add a fixture
//! under `tests/fixtures/`.

use scraper::Selector;
use std::sync::LazyLock;

/// AbeBooks search results.
pub mod abebooks {
    use super::*;

    /// One listing on the results page.
    pub static LISTING: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("ul.result-block#srp-results li[data-cy='listing-item']").unwrap()
    });

    /// schema.org microdata (`itemprop` / `content` pairs).
    pub static META: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("meta[itemprop]").unwrap());

    /// "Ships to Canada" destination link.
    pub static SHIPPING_DEST: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a.item-shipping-dest").unwrap());

    /// Shipping cost text, e.g. "US$ 4.50 Shipping" or "FREE shipping".
    pub static SHIPPING_COST: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.item-shipping").unwrap());

    /// "Seller: <a>name</a>, City, Region, Country".
    pub static SELLER_INFO: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.bookseller-info p.text-secondary").unwrap());

    pub static SELLER_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

    /// Listing title link.
    pub static TITLE_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[itemprop='url'], h2 a").unwrap());
}

/// BiblioCommons catalog search.
pub mod bibliocommons {
    use super::*;

    pub static RESULT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("ul.results li.cp-search-result-item").unwrap());

    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.title-content").unwrap());

    pub static SUBTITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.cp-subtitle").unwrap());

    pub static AUTHOR: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a.author-link").unwrap());

    /// One format/availability variant of a title.
    pub static MANIFESTATION: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.manifestation-item").unwrap());

    pub static FORMAT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.cp-format-indicator").unwrap());

    pub static AVAILABILITY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.cp-availability-status").unwrap());

    pub static CALL_NUMBER: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.cp-call-number").unwrap());

    pub static HOLD_COUNTS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.cp-hold-counts").unwrap());

    pub static ERESOURCE_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a.cp-eresource-link").unwrap());

    pub static ITEM_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a.manifestation-item-link").unwrap());
}

/// Anna's Archive search.
pub mod annas_archive {
    use super::*;

    /// Result card. Cards are identified only by their fixed height class.
    pub static RESULT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div[class~='h-[125]']").unwrap());

    /// Italic banner that precedes the partial-match section.
    pub static ITALIC: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.italic").unwrap());

    pub static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());

    pub static AUTHOR: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.italic").unwrap());

    pub static PUBLISHER: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.text-sm").unwrap());

    /// "English [en], epub, 1.2MB, \"file.epub\"".
    pub static DETAILS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.text-xs").unwrap());
}

/// Goodreads book search.
pub mod goodreads {
    use super::*;

    pub static ROW: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table.tableList tr").unwrap());

    pub static TITLE_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a.bookTitle").unwrap());

    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span[role='heading']").unwrap());

    pub static AUTHOR: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a.authorName").unwrap());

    /// "4.19 avg rating - 123,456 ratings".
    pub static MINIRATING: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.minirating").unwrap());
}

/// Kobo store search.
pub mod kobo {
    use super::*;

    pub static RESULT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("ul.result-items li.book").unwrap());

    pub static TITLE_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h2.title a").unwrap());

    pub static SUBTITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("p.subtitle").unwrap());

    pub static AUTHOR: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.synopsis-text a.contributor-name").unwrap());

    /// Current price (the sale price when a was-price is shown).
    pub static PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".price-value").unwrap());

    /// Struck-through regular price shown during a sale.
    pub static WAS_PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".was-price").unwrap());

    /// Product-type badge on audiobook results.
    pub static AUDIOBOOK_BADGE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".audiobook, .product-type-audiobook").unwrap());
}

/// Indigo (Chapters) search.
pub mod indigo {
    use super::*;

    pub static RESULT: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "div.product-list__results-container div.product-list__product.product-list__product-container",
        )
        .unwrap()
    });

    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("h3.product-list__product-title").unwrap());

    pub static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

    pub static AUTHOR: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("p.product-list__author").unwrap());

    /// "Paperback", "Hardcover", "Kobo ebook", "Audiobook".
    pub static FORMAT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.product-list__product-format").unwrap());

    pub static PRICE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("p.product-list__price--black.product-list__listview-price").unwrap()
    });

    pub static ONLINE_AVAILABILITY: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(r#"div[data-a8n="search-page__online-availability-message"]"#).unwrap()
    });

    pub static STORE_AVAILABILITY: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(r#"div[data-a8n="search-page__store-availability-message"]"#).unwrap()
    });
}

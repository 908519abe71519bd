//! Home-currency pricing with local-seller overrides.

pub mod rates;

use crate::config::Config;
use crate::error::ListingError;
use crate::models::{ComparisonRow, Listing};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

pub use rates::{load_exchange_rates, HttpRateProvider, RateProvider};

/// Exchange-rate table: home-currency units per unit of each foreign currency.
///
/// Built once at start-up and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRates {
    home: String,
    rates: BTreeMap<String, f64>,
}

impl ExchangeRates {
    pub fn new(home: &str) -> Self {
        Self { home: home.to_uppercase(), rates: BTreeMap::new() }
    }

    pub fn with_rate(mut self, currency: &str, rate: f64) -> Self {
        self.insert(currency, rate);
        self
    }

    /// Records a rate. Non-positive or non-finite rates are ignored.
    pub fn insert(&mut self, currency: &str, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.rates.insert(currency.to_uppercase(), rate);
        }
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    /// Home units per unit of `currency`; the home currency itself is 1.
    pub fn rate(&self, currency: &str) -> Option<f64> {
        if currency.eq_ignore_ascii_case(&self.home) {
            Some(1.0)
        } else {
            self.rates.get(&currency.to_uppercase()).copied()
        }
    }

    pub fn convert(&self, amount: f64, currency: &str) -> Option<f64> {
        self.rate(currency).map(|rate| amount * rate)
    }
}

/// A seller treated as local: shipping is free (pickup), and some list home
/// prices under a foreign currency tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSeller {
    pub name: String,

    /// Short display name
    #[serde(default)]
    pub alias: Option<String>,

    /// The listed number is already in the home currency whatever its tag says
    #[serde(default)]
    pub price_in_home_currency: bool,
}

impl LocalSeller {
    pub fn new(name: &str, alias: Option<&str>, price_in_home_currency: bool) -> Self {
        Self { name: name.to_string(), alias: alias.map(String::from), price_in_home_currency }
    }

    /// Case-insensitive name match.
    pub fn matches(&self, seller_name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(seller_name.trim())
    }
}

/// Converts normalized listings into home-currency comparison rows.
#[derive(Debug, Clone)]
pub struct PriceConverter {
    rates: Arc<ExchangeRates>,
    local_sellers: Vec<LocalSeller>,
    home_city: Option<String>,
}

impl PriceConverter {
    pub fn new(rates: Arc<ExchangeRates>, local_sellers: Vec<LocalSeller>, home_city: Option<String>) -> Self {
        Self { rates, local_sellers, home_city }
    }

    pub fn from_config(config: &Config, rates: Arc<ExchangeRates>) -> Self {
        Self::new(rates, config.local_sellers.clone(), config.home_city.clone())
    }

    pub fn rates(&self) -> &ExchangeRates {
        &self.rates
    }

    /// The configured local seller behind this listing, if any.
    pub fn local_seller(&self, listing: &Listing) -> Option<&LocalSeller> {
        let name = listing.seller_name.as_deref()?;
        self.local_sellers.iter().find(|seller| seller.matches(name))
    }

    fn in_home_city(&self, listing: &Listing) -> bool {
        match (&self.home_city, listing.extra("seller_city")) {
            (Some(home), Some(city)) => home.trim().eq_ignore_ascii_case(city.trim()),
            _ => false,
        }
    }

    pub fn is_local(&self, listing: &Listing) -> bool {
        self.local_seller(listing).is_some() || self.in_home_city(listing)
    }

    /// Prices a listing in the home currency.
    ///
    /// Local listings have shipping forced to zero. A local seller flagged
    /// `price_in_home_currency` keeps its raw number unconverted. A listing
    /// priced in a currency with no known rate is rejected.
    pub fn convert(&self, listing: Listing) -> Result<ComparisonRow, ListingError> {
        let local = self.local_seller(&listing);
        let is_local = local.is_some() || self.in_home_city(&listing);
        let raw_is_home = local.is_some_and(|seller| seller.price_in_home_currency);

        let (price_home, shipping_home) = match &listing.price {
            Some(money) => {
                let price = if raw_is_home { money.amount } else { self.to_home(money.amount, &money.currency)? };

                let shipping = if is_local {
                    Some(0.0)
                } else {
                    match listing.shipping {
                        Some(shipping) => Some(self.to_home(shipping, &money.currency)?),
                        None => None,
                    }
                };

                (Some(price), shipping)
            }
            None => (None, if is_local { Some(0.0) } else { None }),
        };

        let total_home = price_home.map(|price| price + shipping_home.unwrap_or(0.0));
        trace!("Priced '{}': {:?} + {:?} = {:?}", listing.title, price_home, shipping_home, total_home);

        Ok(ComparisonRow { listing, price_home, shipping_home, total_home, is_local, rank: None })
    }

    fn to_home(&self, amount: f64, currency: &str) -> Result<f64, ListingError> {
        self.rates.convert(amount, currency).ok_or_else(|| {
            ListingError::SchemaViolation(format!(
                "no exchange rate from {} to {}",
                currency,
                self.rates.home()
            ))
        })
    }
}

/// "13 + 5 = 18" in whole home-currency units; `None` for unpriced rows.
pub fn describe(row: &ComparisonRow) -> Option<String> {
    let price = row.price_home?.round();
    let shipping = row.shipping_home.unwrap_or(0.0).round();
    Some(format!("{:.0} + {:.0} = {:.0}", price, shipping, price + shipping))
}

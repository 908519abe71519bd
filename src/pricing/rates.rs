//! Live exchange rates with configured fallbacks.

use super::ExchangeRates;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, info, warn};
use wreq::Client;

/// Source of currency conversion rates - enables mocking for tests.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Units of `quote` per one unit of `base`.
    async fn rate(&self, base: &str, quote: &str) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: HashMap<String, f64>,
}

/// Rate provider backed by an `/latest/{BASE}` JSON endpoint.
pub struct HttpRateProvider {
    client: Client,
    base_url: String,
}

impl HttpRateProvider {
    pub fn new(base_url: impl Into<String>, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder().gzip(true).timeout(Duration::from_secs(10));

        if let Some(proxy_url) = proxy {
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        Ok(Self { client: builder.build()?, base_url: base_url.into() })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn rate(&self, base: &str, quote: &str) -> Result<f64> {
        let url = format!("{}/latest/{}", self.base_url.trim_end_matches('/'), base.to_uppercase());
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.context("Failed to send rate request")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Rate request failed with status: {}", status);
        }

        let body = response.text().await.context("Failed to read rate response")?;
        let latest: LatestRates = serde_json::from_str(&body).context("Failed to parse rate response")?;

        latest
            .rates
            .get(&quote.to_uppercase())
            .copied()
            .with_context(|| format!("No {} rate in response for {}", quote, base))
    }
}

/// Builds the process-wide rate table.
///
/// Every foreign currency the configuration mentions is looked up once; when
/// the provider is absent or fails, the configured fallback is used instead.
pub async fn load_exchange_rates(provider: Option<&dyn RateProvider>, config: &Config) -> ExchangeRates {
    let home = config.home_currency.to_uppercase();
    let mut rates = ExchangeRates::new(&home);

    let currencies: BTreeSet<String> = config
        .fallback_rates
        .keys()
        .cloned()
        .chain([config.marketplace.currency.clone(), config.kobo_currency.clone()])
        .map(|c| c.to_uppercase())
        .filter(|c| *c != home)
        .collect();

    for currency in currencies {
        let live = match provider {
            Some(provider) => match provider.rate(&currency, &home).await {
                Ok(rate) if rate.is_finite() && rate > 0.0 => Some(rate),
                Ok(rate) => {
                    warn!("Ignoring invalid {}->{} rate {}", currency, home, rate);
                    None
                }
                Err(e) => {
                    warn!("Exchange rate {}->{} unavailable: {:#}", currency, home, e);
                    None
                }
            },
            None => None,
        };

        match live.or_else(|| config.fallback_rates.get(&currency).copied()) {
            Some(rate) => {
                info!("Using {}->{} rate {}", currency, home, rate);
                rates.insert(&currency, rate);
            }
            None => warn!("No {}->{} rate; listings priced in {} will be dropped", currency, home, currency),
        }
    }

    rates
}

//! CLI command implementations.

pub mod batch;
pub mod digest;
pub mod search;

pub use batch::BatchCommand;
pub use digest::DigestCommand;
pub use search::SearchCommand;

use crate::client::Fetcher;
use crate::config::Config;
use crate::filters::FilterChain;
use crate::models::{Format, SourceId};
use crate::pricing::rates::{load_exchange_rates, HttpRateProvider, RateProvider};
use crate::pricing::PriceConverter;
use crate::query::QuerySpec;
use crate::search::{SearchOrchestrator, SearchReport};
use crate::sources::AdapterRegistry;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Loads exchange rates once and builds the converter every command shares.
pub async fn build_converter(config: &Config) -> Result<Arc<PriceConverter>> {
    let provider = match &config.rate_api_url {
        Some(url) => Some(
            HttpRateProvider::new(url.as_str(), config.proxy.as_deref())
                .context("Failed to create exchange rate client")?,
        ),
        None => None,
    };

    let rates = load_exchange_rates(provider.as_ref().map(|p| p as &dyn RateProvider), config).await;
    Ok(Arc::new(PriceConverter::from_config(config, Arc::new(rates))))
}

/// Source ids picked in the config; empty means every registered source.
pub fn selected_sources(config: &Config) -> Vec<SourceId> {
    config.sources.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(SourceId::new).collect()
}

pub(crate) fn orchestrator(
    config: &Config,
    fetcher: Arc<dyn Fetcher>,
    converter: Arc<PriceConverter>,
) -> SearchOrchestrator {
    SearchOrchestrator::new(AdapterRegistry::from_config(config), fetcher, converter)
        .with_timeout(Duration::from_secs(config.timeout_secs.max(1)))
}

/// Runs one query and drops rows outside the requested formats.
pub(crate) async fn run_search(
    config: &Config,
    fetcher: Arc<dyn Fetcher>,
    converter: Arc<PriceConverter>,
    query: &QuerySpec,
    formats: &[Format],
    cancel: &CancellationToken,
) -> SearchReport {
    let filters = FilterChain::builder().formats(formats.to_vec()).build();
    if !filters.is_empty() {
        debug!("Active filters: {}", filters.descriptions().join(", "));
    }

    let mut report = orchestrator(config, fetcher, converter).search(query, &selected_sources(config), cancel).await;

    if !filters.is_empty() {
        for outcome in &mut report.outcomes {
            let before = outcome.rows.len();
            outcome.rows = filters.apply_rows(std::mem::take(&mut outcome.rows));
            outcome.filtered += before - outcome.rows.len();
        }
    }

    report
}

//! Digest command: one summary line per source.

use super::{build_converter, run_search};
use crate::aggregate;
use crate::client::{Fetcher, HttpFetcher};
use crate::config::Config;
use crate::format::Formatter;
use crate::models::Format;
use crate::pricing::PriceConverter;
use crate::query::QuerySpec;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct DigestCommand {
    config: Config,
    formats: Vec<Format>,
}

impl DigestCommand {
    pub fn new(config: Config) -> Self {
        Self { config, formats: Vec::new() }
    }

    pub fn with_formats(mut self, formats: Vec<Format>) -> Self {
        self.formats = formats;
        self
    }

    pub async fn execute(&self, query: &QuerySpec, cancel: &CancellationToken) -> Result<String> {
        let fetcher = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;
        let converter = build_converter(&self.config).await?;

        self.execute_with(Arc::new(fetcher), converter, query, cancel).await
    }

    pub async fn execute_with(
        &self,
        fetcher: Arc<dyn Fetcher>,
        converter: Arc<PriceConverter>,
        query: &QuerySpec,
        cancel: &CancellationToken,
    ) -> Result<String> {
        info!("Digest for: {}", query);

        let report = run_search(&self.config, fetcher, Arc::clone(&converter), query, &self.formats, cancel).await;
        let digest = aggregate::digest(&report, &converter);

        Ok(Formatter::new(self.config.format).format_digest(&digest))
    }
}

//! Search command implementation.

use super::{build_converter, run_search};
use crate::client::{Fetcher, HttpFetcher};
use crate::config::Config;
use crate::format::{Formatter, ReportView};
use crate::models::Format;
use crate::pricing::PriceConverter;
use crate::query::QuerySpec;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Searches every selected source and prints the full comparison report.
pub struct SearchCommand {
    config: Config,
    formats: Vec<Format>,
}

impl SearchCommand {
    /// Creates a new search command.
    pub fn new(config: Config) -> Self {
        Self { config, formats: Vec::new() }
    }

    /// Only keep listings in these formats.
    pub fn with_formats(mut self, formats: Vec<Format>) -> Self {
        self.formats = formats;
        self
    }

    /// Executes the search and returns formatted output.
    pub async fn execute(&self, query: &QuerySpec, cancel: &CancellationToken) -> Result<String> {
        let fetcher = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;
        let converter = build_converter(&self.config).await?;

        self.execute_with(Arc::new(fetcher), converter, query, cancel).await
    }

    /// Executes the search with a provided fetcher and converter (for testing).
    pub async fn execute_with(
        &self,
        fetcher: Arc<dyn Fetcher>,
        converter: Arc<PriceConverter>,
        query: &QuerySpec,
        cancel: &CancellationToken,
    ) -> Result<String> {
        info!("Searching for: {}", query);

        let report = run_search(&self.config, fetcher, Arc::clone(&converter), query, &self.formats, cancel).await;
        let view = ReportView::build(&report, &converter, self.config.max_rows);

        info!("Found {} listings", view.total_listings);

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_report(&view))
    }
}

//! Batch command: a file of queries searched one after another.

use super::{build_converter, orchestrator, selected_sources};
use crate::batch::{parse_batch, summarize_batch, BatchDriver};
use crate::client::{Fetcher, HttpFetcher, PacedFetcher};
use crate::config::Config;
use crate::format::Formatter;
use crate::pricing::PriceConverter;
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct BatchCommand {
    config: Config,
    separator: String,
}

impl BatchCommand {
    pub const DEFAULT_SEPARATOR: &'static str = ";";

    pub fn new(config: Config) -> Self {
        Self { config, separator: Self::DEFAULT_SEPARATOR.to_string() }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Reads `path` and searches each query, pacing requests per source.
    pub async fn execute(&self, path: &Path, cancel: &CancellationToken) -> Result<String> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read batch file: {}", path.display()))?;

        let client = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;
        let fetcher = PacedFetcher::from_config(client, &self.config);
        let converter = build_converter(&self.config).await?;

        self.execute_with(Arc::new(fetcher), converter, &text, cancel).await
    }

    /// Runs already-read batch text with a provided fetcher (for testing).
    pub async fn execute_with(
        &self,
        fetcher: Arc<dyn Fetcher>,
        converter: Arc<PriceConverter>,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if self.separator.is_empty() {
            bail!("Batch separator must not be empty");
        }

        let input = parse_batch(text, &self.separator);
        if !input.skipped.is_empty() {
            warn!("Skipped {} unusable lines", input.skipped.len());
        }
        if input.queries.is_empty() {
            bail!("No queries found in batch input");
        }

        info!("Running {} queries", input.queries.len());

        let driver = BatchDriver::new(orchestrator(&self.config, fetcher, converter), selected_sources(&self.config));
        let reports = driver.run(&input.queries, cancel).await;

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_batch(&summarize_batch(&reports)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::*;
    use crate::config::OutputFormat;
    use std::io::Write;

    #[tokio::test]
    async fn test_batch_command_runs_each_query() {
        let config = make_test_config(&["abebooks", "goodreads"], OutputFormat::Json);
        let converter = make_converter(&config);
        let fetcher = Arc::new(FixtureFetcher::new(&[("abebooks", ABEBOOKS), ("goodreads", GOODREADS)]));

        let text = "# author;title\nCormac McCarthy;Blood Meridian\n\nCormac McCarthy;Blood Meridian;\n";
        let cmd = BatchCommand::new(config);
        let output = cmd.execute_with(fetcher.clone(), converter, text, &CancellationToken::new()).await.unwrap();

        assert_eq!(fetcher.call_count(), 4);

        let rows: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["source"], "abebooks");
        assert_eq!(rows[0]["count"], 4);
        assert_eq!(rows[0]["min_total"], 12.0);
        assert_eq!(rows[0]["status"], "ok");
        assert_eq!(rows[1]["source"], "goodreads");
        assert_eq!(rows[1]["count"], 2);
    }

    #[tokio::test]
    async fn test_batch_command_custom_separator() {
        let config = make_test_config(&["abebooks"], OutputFormat::Json);
        let converter = make_converter(&config);
        let fetcher = Arc::new(FixtureFetcher::new(&[]));

        let cmd = BatchCommand::new(config).with_separator("|");
        let output = cmd
            .execute_with(fetcher, converter, "Cormac McCarthy|Blood Meridian\n", &CancellationToken::new())
            .await
            .unwrap();

        let rows: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["count"], 0);
        assert_eq!(rows[0]["status"], "transport error: connection refused");
    }

    #[tokio::test]
    async fn test_batch_command_no_queries() {
        let config = make_test_config(&["abebooks"], OutputFormat::Table);
        let converter = make_converter(&config);
        let fetcher = Arc::new(FixtureFetcher::new(&[]));

        let cmd = BatchCommand::new(config);
        let err = cmd.execute_with(fetcher, converter, "# nothing\n;;\n", &CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("No queries"));
    }

    #[tokio::test]
    async fn test_batch_command_cancelled_before_start() {
        let config = make_test_config(&["abebooks"], OutputFormat::Json);
        let converter = make_converter(&config);
        let fetcher = Arc::new(FixtureFetcher::new(&[("abebooks", ABEBOOKS)]));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let cmd = BatchCommand::new(config);
        let output = cmd.execute_with(fetcher.clone(), converter, "a;b\nc;d\n", &cancel).await.unwrap();
        assert_eq!(output, "[]");
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_command_missing_file() {
        let cmd = BatchCommand::new(make_test_config(&[], OutputFormat::Table));
        let err = cmd.execute(Path::new("/nonexistent/queries.txt"), &CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read batch file"));
    }

    #[tokio::test]
    async fn test_batch_command_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# queued for later").unwrap();
        writeln!(file, ";;").unwrap();

        let cmd = BatchCommand::new(make_test_config(&["abebooks"], OutputFormat::Table));
        let err = cmd.execute(file.path(), &CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("No queries"));
    }
}

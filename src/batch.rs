//! Many queries, one after another.

use crate::error::QueryError;
use crate::models::SourceId;
use crate::query::QuerySpec;
use crate::search::{SearchOrchestrator, SearchReport};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Queries read from a batch file.
#[derive(Debug, Default)]
pub struct BatchInput {
    pub queries: Vec<QuerySpec>,
    /// 1-based line numbers that held no usable query
    pub skipped: Vec<usize>,
}

/// Reads one query per line as `author<sep>title[<sep>keywords]`.
///
/// Blank lines and `#` comments are ignored. Missing trailing columns are
/// empty; a line with no author, title or keywords is skipped.
pub fn parse_batch(text: &str, separator: &str) -> BatchInput {
    let mut input = BatchInput::default();

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut columns = line.split(separator).map(str::trim);
        let builder = QuerySpec::builder()
            .author(columns.next().unwrap_or_default())
            .title(columns.next().unwrap_or_default())
            .keywords(columns.next().unwrap_or_default());

        match builder.build() {
            Ok(query) => input.queries.push(query),
            Err(QueryError::Empty) => {
                warn!("Line {}: no author, title or keywords; skipping", i + 1);
                input.skipped.push(i + 1);
            }
        }
    }

    input
}

/// Runs queries through one orchestrator, sequentially.
///
/// Request pacing belongs to the orchestrator's fetcher; the driver only
/// keeps queries from overlapping.
pub struct BatchDriver {
    orchestrator: SearchOrchestrator,
    sources: Vec<SourceId>,
}

impl BatchDriver {
    pub fn new(orchestrator: SearchOrchestrator, sources: Vec<SourceId>) -> Self {
        Self { orchestrator, sources }
    }

    /// One report per query, in input order. Stops early once `cancel` fires.
    pub async fn run(&self, queries: &[QuerySpec], cancel: &CancellationToken) -> Vec<SearchReport> {
        let mut reports = Vec::with_capacity(queries.len());

        for (i, query) in queries.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("Batch cancelled after {} of {} queries", i, queries.len());
                break;
            }

            info!("[{}/{}] {}", i + 1, queries.len(), query);
            reports.push(self.orchestrator.search(query, &self.sources, cancel).await);
        }

        reports
    }
}

/// Per query and source: how many rows and what they cost in total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummaryRow {
    pub query: String,
    pub source: SourceId,
    pub count: usize,
    pub min_total: Option<f64>,
    pub max_total: Option<f64>,
    /// `ok`, `empty` or the error that degraded the source
    pub status: String,
}

pub fn summarize_batch(reports: &[SearchReport]) -> Vec<BatchSummaryRow> {
    let mut rows = Vec::new();

    for report in reports {
        let query = report.query.to_string();
        for outcome in &report.outcomes {
            let totals: Vec<f64> = outcome.rows.iter().filter_map(|r| r.total_home).collect();
            let status = match &outcome.error {
                Some(e) => e.to_string(),
                None if outcome.rows.is_empty() => "empty".to_string(),
                None => "ok".to_string(),
            };

            rows.push(BatchSummaryRow {
                query: query.clone(),
                source: outcome.source.clone(),
                count: outcome.rows.len(),
                min_total: totals.iter().copied().reduce(f64::min),
                max_total: totals.iter().copied().reduce(f64::max),
                status,
            });
        }
    }

    rows
}

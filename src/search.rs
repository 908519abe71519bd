//! Fan-out of one query across the selected sources.

use crate::client::Fetcher;
use crate::error::SourceError;
use crate::filters::FilterChain;
use crate::models::{ComparisonRow, SourceId};
use crate::pricing::PriceConverter;
use crate::query::QuerySpec;
use crate::sources::{AdapterRegistry, SourceAdapter, SourceKind};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one source contributed to a search.
#[derive(Debug, Serialize)]
pub struct SourceOutcome {
    pub source: SourceId,
    /// `None` when the source id is not registered
    pub kind: Option<SourceKind>,
    pub rows: Vec<ComparisonRow>,
    /// Listings dropped by validation, normalization or pricing
    pub rejected: usize,
    /// Listings dropped by the relevance re-check
    pub filtered: usize,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<SourceError>,
}

fn serialize_error<S: Serializer>(error: &Option<SourceError>, serializer: S) -> Result<S::Ok, S::Error> {
    error.as_ref().map(|e| e.to_string()).serialize(serializer)
}

impl SourceOutcome {
    fn degraded(source: SourceId, kind: Option<SourceKind>, error: SourceError) -> Self {
        Self { source, kind, rows: Vec::new(), rejected: 0, filtered: 0, error: Some(error) }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Completed without error but produced no rows.
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.rows.is_empty()
    }
}

/// Result of one query across every selected source, in selection order.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub query: QuerySpec,
    pub outcomes: Vec<SourceOutcome>,
}

impl SearchReport {
    /// Every row from every source, in source order.
    pub fn rows(&self) -> Vec<ComparisonRow> {
        self.outcomes.iter().flat_map(|o| o.rows.iter().cloned()).collect()
    }

    pub fn outcome(&self, source: &SourceId) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|o| &o.source == source)
    }

    /// Explains missing results; `None` when every source produced rows.
    pub fn status_line(&self) -> Option<String> {
        if self.outcomes.iter().all(|o| o.rows.is_empty()) {
            return Some(format!("no results across {} sources attempted", self.outcomes.len()));
        }

        let join = |pick: fn(&SourceOutcome) -> bool| {
            self.outcomes.iter().filter(|o| pick(o)).map(|o| o.source.as_str()).collect::<Vec<_>>().join(", ")
        };
        let empty = join(SourceOutcome::is_empty);
        let degraded = join(SourceOutcome::is_degraded);

        let mut parts = Vec::new();
        if !empty.is_empty() {
            parts.push(format!("no results for sources {}", empty));
        }
        if !degraded.is_empty() {
            parts.push(format!("degraded: {}", degraded));
        }

        if parts.is_empty() { None } else { Some(parts.join(", ")) }
    }
}

/// Rows that survived one source's pipeline, with drop counts.
#[derive(Debug, Default)]
pub struct Processed {
    pub rows: Vec<ComparisonRow>,
    pub rejected: usize,
    pub filtered: usize,
}

/// Runs a fetched body through parse, validate, normalize, price and, for
/// loose sources, the relevance re-check. Bad listings are dropped one by
/// one; only an unreadable body fails the source.
pub fn process_body(
    adapter: &dyn SourceAdapter,
    query: &QuerySpec,
    converter: &PriceConverter,
    body: &[u8],
) -> Result<Processed, SourceError> {
    let raws = adapter.parse(body)?;
    let table = adapter.normalization();
    let relevance = adapter.needs_refilter().then(|| FilterChain::builder().relevance(query).build());
    let mut processed = Processed::default();

    for raw in raws {
        let priced = adapter
            .validate(&raw)
            .and_then(|_| table.normalize(adapter.id(), &raw))
            .and_then(|listing| converter.convert(listing));

        match priced {
            Ok(row) if relevance.as_ref().map_or(true, |f| f.matches(&row.listing)) => processed.rows.push(row),
            Ok(row) => {
                debug!("[{}] not relevant: {} / {}", adapter.id(), row.listing.title, row.listing.author);
                processed.filtered += 1;
            }
            Err(e) => {
                warn!("[{}] dropping listing: {}", adapter.id(), e);
                processed.rejected += 1;
            }
        }
    }

    Ok(processed)
}

/// Drives the pipeline for one query at a time.
#[derive(Clone)]
pub struct SearchOrchestrator {
    registry: AdapterRegistry,
    fetcher: Arc<dyn Fetcher>,
    converter: Arc<PriceConverter>,
    timeout: Duration,
}

impl SearchOrchestrator {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(registry: AdapterRegistry, fetcher: Arc<dyn Fetcher>, converter: Arc<PriceConverter>) -> Self {
        Self { registry, fetcher, converter, timeout: Self::DEFAULT_TIMEOUT }
    }

    /// Per-source limit on the fetch.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Searches `sources` (every registered source when empty) concurrently.
    ///
    /// A failing, timed-out or cancelled source is recorded in the report and
    /// never holds up the others.
    pub async fn search(&self, query: &QuerySpec, sources: &[SourceId], cancel: &CancellationToken) -> SearchReport {
        let selected = if sources.is_empty() { self.registry.ids() } else { sources.to_vec() };
        info!("Searching {} sources for {}", selected.len(), query);

        let query = Arc::new(query.clone());
        let mut pending: Vec<(SourceId, Option<SourceKind>, Option<JoinHandle<Result<Processed, SourceError>>>)> =
            Vec::with_capacity(selected.len());

        for id in selected {
            match self.registry.resolve(&id) {
                Ok(adapter) => {
                    let kind = adapter.kind();
                    let handle = tokio::spawn(run_source(
                        adapter,
                        Arc::clone(&query),
                        Arc::clone(&self.fetcher),
                        Arc::clone(&self.converter),
                        self.timeout,
                        cancel.clone(),
                    ));
                    pending.push((id, Some(kind), Some(handle)));
                }
                Err(e) => {
                    warn!("Skipping {}: {}", id, e);
                    pending.push((id, None, None));
                }
            }
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        for (id, kind, handle) in pending {
            let result = match handle {
                Some(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(SourceError::Transport(format!("source task failed: {}", e))),
                },
                None => Err(SourceError::UnknownSource(id.to_string())),
            };

            let outcome = match result {
                Ok(processed) => {
                    debug!(
                        "[{}] {} rows ({} rejected, {} not relevant)",
                        id,
                        processed.rows.len(),
                        processed.rejected,
                        processed.filtered
                    );
                    SourceOutcome {
                        source: id,
                        kind,
                        rows: processed.rows,
                        rejected: processed.rejected,
                        filtered: processed.filtered,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("[{}] degraded: {}", id, e);
                    SourceOutcome::degraded(id, kind, e)
                }
            };
            outcomes.push(outcome);
        }

        SearchReport { query: Arc::unwrap_or_clone(query), outcomes }
    }
}

async fn run_source(
    adapter: Arc<dyn SourceAdapter>,
    query: Arc<QuerySpec>,
    fetcher: Arc<dyn Fetcher>,
    converter: Arc<PriceConverter>,
    timeout: Duration,
    cancel: CancellationToken,
) -> Result<Processed, SourceError> {
    let request = adapter.compose_request(&query);
    debug!("[{}] {}", adapter.id(), request.url);

    let body = tokio::select! {
        _ = cancel.cancelled() => Err(SourceError::Cancelled),
        fetched = tokio::time::timeout(timeout, fetcher.fetch(&request)) => {
            fetched.unwrap_or(Err(SourceError::Timeout(timeout)))
        }
    }?;

    process_body(adapter.as_ref(), &query, &converter, &body)
}

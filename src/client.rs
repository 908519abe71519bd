//! HTTP fetching for composed source requests.

use crate::config::Config;
use crate::error::SourceError;
use crate::models::SourceId;
use crate::sources::RequestDescriptor;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use wreq::Client;

/// Trait for executing source requests - enables mocking for tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs one request and returns the raw body.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Vec<u8>, SourceError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Vec<u8>, SourceError> {
        (**self).fetch(request).await
    }
}

/// Plain HTTP fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        Ok(Self { client: builder.build()? })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Vec<u8>, SourceError> {
        debug!("GET {} [{}]", request.url, request.source);

        let response = self
            .client
            .get(&request.url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            if status == 429 || status == 503 {
                warn!("{} is rate limiting. Consider increasing --delay or using a proxy.", request.source);
            }
            return Err(SourceError::Transport(format!("request failed with status: {}", status)));
        }

        let body = response.bytes().await.map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Wraps a fetcher so consecutive requests to the same source are spaced by
/// at least `delay_ms`, plus up to `jitter_ms` of random slack.
pub struct PacedFetcher<F> {
    inner: F,
    delay_ms: u64,
    jitter_ms: u64,
    next_slot: Mutex<HashMap<SourceId, Instant>>,
}

impl<F: Fetcher> PacedFetcher<F> {
    pub fn new(inner: F, delay_ms: u64, jitter_ms: u64) -> Self {
        Self { inner, delay_ms, jitter_ms, next_slot: Mutex::new(HashMap::new()) }
    }

    pub fn from_config(inner: F, config: &Config) -> Self {
        Self::new(inner, config.delay_ms, config.delay_jitter_ms)
    }

    fn spacing(&self) -> Duration {
        let jitter = if self.jitter_ms > 0 { rand::random_range(0..=self.jitter_ms) } else { 0 };
        Duration::from_millis(self.delay_ms + jitter)
    }

    /// Reserves the next request slot for `source` and returns how long to
    /// wait for it.
    async fn reserve(&self, source: &SourceId) -> Duration {
        let now = Instant::now();
        let mut slots = self.next_slot.lock().await;

        let start = match slots.get(source) {
            Some(&slot) if slot > now => slot,
            _ => now,
        };
        slots.insert(source.clone(), start + self.spacing());

        start - now
    }

    /// Pushes the next slot for `source` to a full spacing after a request
    /// finished, so slow responses still leave a gap.
    async fn release(&self, source: &SourceId) {
        let earliest = Instant::now() + self.spacing();
        let mut slots = self.next_slot.lock().await;

        match slots.get_mut(source) {
            Some(slot) if *slot >= earliest => {}
            Some(slot) => *slot = earliest,
            None => {
                slots.insert(source.clone(), earliest);
            }
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for PacedFetcher<F> {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Vec<u8>, SourceError> {
        if self.delay_ms == 0 && self.jitter_ms == 0 {
            return self.inner.fetch(request).await;
        }

        let wait = self.reserve(&request.source).await;
        if !wait.is_zero() {
            debug!("Delaying {}ms before next {} request", wait.as_millis(), request.source);
            tokio::time::sleep(wait).await;
        }

        let result = self.inner.fetch(request).await;
        self.release(&request.source).await;
        result
    }
}

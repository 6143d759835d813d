// src/aggregator/mod.rs
//! # Aggregator Cache
//! TTL-bounded cache fronting the external aggregation APIs.
//!
//! Refresh is single-flight per aggregator: a `tokio::sync::Mutex` guards the
//! critical section and concurrent callers that lose the `try_lock` race get
//! the current (possibly stale) items instead of blocking or duplicating the
//! upstream call. On refresh failure the last good items are kept and the
//! entry stays stale, so the next caller retries (stale-while-revalidate).

pub mod clients;

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::aggregator::clients::AggregatorClient;
use crate::cache::{Clock, TtlCache};
use crate::ingest::types::NewsItem;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregator_refresh_total",
            "Successful aggregator refreshes."
        );
        describe_counter!(
            "aggregator_refresh_errors_total",
            "Aggregator refreshes that failed or timed out."
        );
    });
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregatorStatus {
    pub id: String,
    pub configured: bool,
    pub cached_count: usize,
    pub last_fetched_at: Option<u64>,
    pub ttl_secs: u64,
    pub stale: bool,
}

struct Entry {
    client: Arc<dyn AggregatorClient>,
    cache: TtlCache<Vec<NewsItem>>,
    refresh_gate: tokio::sync::Mutex<()>,
}

pub struct AggregatorCache {
    entries: Vec<Entry>,
    upstream_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl AggregatorCache {
    pub fn new(
        clients: Vec<Arc<dyn AggregatorClient>>,
        ttl: Duration,
        upstream_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ensure_metrics_described();
        let entries = clients
            .into_iter()
            .map(|client| Entry {
                client,
                cache: TtlCache::new(ttl),
                refresh_gate: tokio::sync::Mutex::new(()),
            })
            .collect();
        Self {
            entries,
            upstream_timeout,
            clock,
        }
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.client.id()).collect()
    }

    /// Cached items while fresh; otherwise a single-flight refresh.
    ///
    /// Never fails: unknown ids, unconfigured providers, and upstream errors
    /// all degrade to the best currently-known items (possibly empty).
    pub async fn get_or_refresh(&self, id: &str) -> Vec<NewsItem> {
        let Some(entry) = self.entries.iter().find(|e| e.client.id() == id) else {
            tracing::warn!(aggregator = %id, "unknown aggregator id");
            return Vec::new();
        };
        if !entry.client.configured() {
            return Vec::new();
        }

        if let Some(items) = entry.cache.get_fresh(self.clock.as_ref()) {
            return items;
        }

        match entry.refresh_gate.try_lock() {
            Ok(_guard) => self.refresh_entry(entry).await,
            // A refresh is already in flight; serve what we have.
            Err(_) => entry.cache.peek().unwrap_or_default(),
        }
    }

    /// Scheduled pass: refresh every configured aggregator regardless of
    /// demand. Entries with a demand-refresh in flight are skipped.
    pub async fn refresh_all(&self) {
        for entry in &self.entries {
            if !entry.client.configured() {
                continue;
            }
            if let Ok(_guard) = entry.refresh_gate.try_lock() {
                self.refresh_entry(entry).await;
            }
        }
    }

    /// Caller must hold the entry's refresh gate.
    async fn refresh_entry(&self, entry: &Entry) -> Vec<NewsItem> {
        let id = entry.client.id();
        let attempt = tokio::time::timeout(self.upstream_timeout, entry.client.fetch_latest());
        match attempt.await {
            Ok(Ok(items)) => {
                counter!("aggregator_refresh_total").increment(1);
                tracing::info!(aggregator = %id, count = items.len(), "aggregator refreshed");
                entry.cache.put(items.clone(), self.clock.as_ref());
                items
            }
            Ok(Err(e)) => {
                counter!("aggregator_refresh_errors_total").increment(1);
                tracing::warn!(error = ?e, aggregator = %id, "aggregator refresh failed; keeping last good data");
                entry.cache.peek().unwrap_or_default()
            }
            Err(_) => {
                counter!("aggregator_refresh_errors_total").increment(1);
                tracing::warn!(aggregator = %id, "aggregator refresh timed out; keeping last good data");
                entry.cache.peek().unwrap_or_default()
            }
        }
    }

    pub fn status(&self) -> Vec<AggregatorStatus> {
        self.entries
            .iter()
            .map(|e| AggregatorStatus {
                id: e.client.id().to_string(),
                configured: e.client.configured(),
                cached_count: e.cache.peek().map(|v| v.len()).unwrap_or(0),
                last_fetched_at: e.cache.last_stored_at(),
                ttl_secs: e.cache.ttl_secs(),
                stale: e.cache.is_stale(self.clock.as_ref()),
            })
            .collect()
    }
}

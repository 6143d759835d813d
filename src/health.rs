// src/health.rs
//! # Health Monitor
//! Probes every catalog source, classifies latency into a status, and serves
//! an aggregated snapshot. Runs on a repeating background pass; a manual
//! refresh starts an out-of-band pass without blocking its caller.
//!
//! State machine per source: `Unknown -> {Green | Amber | Red}` on the first
//! probe; later probes transition freely among the three.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics::counter;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::cache::Clock;
use crate::sources::{FeedSource, SourceRegistry};

/// Latency below this is green.
pub const LATENCY_GREEN_MS: u64 = 500;
/// Latency below this (and at/above green) is amber; above is red.
pub const LATENCY_AMBER_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Amber,
    Red,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceHealthRecord {
    pub source_name: String,
    pub region: String,
    pub status: HealthStatus,
    pub latency_ms: u64,
    pub last_checked_at: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub green: usize,
    pub amber: usize,
    pub red: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: HealthStatus) {
        self.total += 1;
        match status {
            HealthStatus::Green => self.green += 1,
            HealthStatus::Amber => self.amber += 1,
            HealthStatus::Red => self.red += 1,
            HealthStatus::Unknown => {}
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub by_region: BTreeMap<String, StatusCounts>,
}

/// Classify a successful probe by latency. Errors and timeouts are red and
/// never reach this function.
pub fn classify_latency(latency_ms: u64) -> HealthStatus {
    if latency_ms < LATENCY_GREEN_MS {
        HealthStatus::Green
    } else if latency_ms < LATENCY_AMBER_MS {
        HealthStatus::Amber
    } else {
        HealthStatus::Red
    }
}

pub struct HealthMonitor {
    client: reqwest::Client,
    probe_timeout: Duration,
    records: Mutex<HashMap<String, SourceHealthRecord>>,
    clock: Arc<dyn Clock>,
}

impl HealthMonitor {
    /// Seeds one `Unknown` record per catalog source, so never-probed sources
    /// are visible from the start.
    pub fn new(registry: &SourceRegistry, probe_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("newscast-engine/0.1 (+https://github.com/newscast/newscast-engine)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(probe_timeout)
            .build()
            .expect("reqwest client");

        let mut records = HashMap::with_capacity(registry.len());
        for source in registry.feeds() {
            records.insert(
                source.display_name.clone(),
                SourceHealthRecord {
                    source_name: source.display_name.clone(),
                    region: source.region.clone(),
                    status: HealthStatus::Unknown,
                    latency_ms: 0,
                    last_checked_at: None,
                },
            );
        }

        Self {
            client,
            probe_timeout,
            records: Mutex::new(records),
            clock,
        }
    }

    /// One full pass: all sources probed concurrently, each with its own
    /// timeout, so the aggregate pass stays bounded.
    pub async fn probe_all(&self, registry: &SourceRegistry) {
        let mut tasks = JoinSet::new();
        for source in registry.feeds() {
            let client = self.client.clone();
            let timeout = self.probe_timeout;
            let source = source.clone();
            tasks.spawn(async move {
                let outcome = probe_one(&client, timeout, &source).await;
                (source, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((source, (status, latency_ms))) = joined else {
                continue;
            };
            if status == HealthStatus::Red {
                counter!("health_probe_failures_total").increment(1);
            }
            self.record(&source, status, latency_ms);
        }

        tracing::debug!(total = registry.len(), "health pass complete");
    }

    fn record(&self, source: &FeedSource, status: HealthStatus, latency_ms: u64) {
        let mut records = self.records.lock().expect("health records mutex poisoned");
        records.insert(
            source.display_name.clone(),
            SourceHealthRecord {
                source_name: source.display_name.clone(),
                region: source.region.clone(),
                status,
                latency_ms,
                last_checked_at: Some(self.clock.now_unix()),
            },
        );
    }

    /// Per-source detail, sorted by name for stable output.
    pub fn detail(&self) -> Vec<SourceHealthRecord> {
        let records = self.records.lock().expect("health records mutex poisoned");
        let mut out: Vec<_> = records.values().cloned().collect();
        out.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        out
    }

    pub fn summary(&self) -> HealthSummary {
        let records = self.records.lock().expect("health records mutex poisoned");
        let mut counts = StatusCounts::default();
        let mut by_region: BTreeMap<String, StatusCounts> = BTreeMap::new();

        for rec in records.values() {
            counts.bump(rec.status);
            by_region.entry(rec.region.clone()).or_default().bump(rec.status);
        }

        HealthSummary { counts, by_region }
    }
}

async fn probe_one(
    client: &reqwest::Client,
    timeout: Duration,
    source: &FeedSource,
) -> (HealthStatus, u64) {
    let started = Instant::now();
    let attempt = tokio::time::timeout(timeout, client.get(&source.url).send());

    match attempt.await {
        Ok(Ok(resp)) if resp.status().is_success() => {
            let latency_ms = started.elapsed().as_millis() as u64;
            (classify_latency(latency_ms), latency_ms)
        }
        Ok(Ok(resp)) => {
            tracing::warn!(source = %source.display_name, status = %resp.status(), "probe got error status");
            (HealthStatus::Red, started.elapsed().as_millis() as u64)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = ?e, source = %source.display_name, "probe failed");
            (HealthStatus::Red, started.elapsed().as_millis() as u64)
        }
        Err(_) => {
            tracing::warn!(source = %source.display_name, "probe timed out");
            (HealthStatus::Red, timeout.as_millis() as u64)
        }
    }
}

// src/engine.rs
//! # Engine facade
//! `NewsEngine` owns the registry, fetcher, aggregator cache, health
//! monitor, rate limiter, and scheduler, and exposes the caller-facing
//! operations. HTTP routing, TTS, and settings CRUD live outside this crate
//! and talk to the engine by handle.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::aggregator::clients::{AggregatorClient, GNewsClient, NewsDataClient};
use crate::aggregator::{AggregatorCache, AggregatorStatus};
use crate::ai::{build_expander, SharedExpander};
use crate::cache::{Clock, RateLimiter, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::health::{HealthMonitor, HealthSummary, SourceHealthRecord};
use crate::ingest::rss::FeedFetcher;
use crate::ingest::types::{NewsItem, SourceType};
use crate::ingest::fetch_all;
use crate::merge::{merge, Pagination, SearchFilters, SearchPage};
use crate::recommend::{RecommendationResult, Recommender};
use crate::scheduler::Scheduler;
use crate::sources::SourceRegistry;
use crate::store::ListenStore;
use crate::trending::{self, TrendingReport};

/// Upper bound accepted for `limit` parameters.
pub const MAX_LIMIT: usize = 100;
/// Upper bound accepted for pagination `skip`.
pub const MAX_SKIP: usize = 10_000;
/// Pool size fed into trending and recommendation scoring.
const CANDIDATE_POOL_SIZE: usize = 50;
/// Pool size fed into free-text search before filtering.
const SEARCH_POOL_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub summary: HealthSummary,
    pub sources: Vec<SourceHealthRecord>,
}

pub struct NewsEngine {
    cfg: EngineConfig,
    registry: Arc<SourceRegistry>,
    fetcher: Arc<FeedFetcher>,
    aggregators: Arc<AggregatorCache>,
    health: Arc<HealthMonitor>,
    recommender: Recommender,
    rate_limiter: RateLimiter,
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
}

impl NewsEngine {
    pub fn new(
        cfg: EngineConfig,
        registry: SourceRegistry,
        aggregator_clients: Vec<Arc<dyn AggregatorClient>>,
        store: Arc<dyn ListenStore>,
        expander: SharedExpander,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = Arc::new(registry);
        let fetcher = Arc::new(FeedFetcher::new(
            cfg.fetch_timeout(),
            cfg.max_items_per_feed,
        ));
        let aggregators = Arc::new(AggregatorCache::new(
            aggregator_clients,
            cfg.cache_ttl(),
            cfg.aggregator_timeout(),
            Arc::clone(&clock),
        ));
        let health = Arc::new(HealthMonitor::new(
            &registry,
            cfg.probe_timeout(),
            Arc::clone(&clock),
        ));
        let recommender = Recommender::new(store, expander, Arc::clone(&clock));
        let rate_limiter = RateLimiter::new(
            Duration::from_secs(cfg.rate_limit_window_secs),
            cfg.rate_limit_max_hits,
        );

        Self {
            cfg,
            registry,
            fetcher,
            aggregators,
            health,
            recommender,
            rate_limiter,
            scheduler: Scheduler::new(),
            clock,
        }
    }

    /// Production wiring: env-driven config, built-in catalog fallback, env
    /// API keys, system clock.
    pub fn with_defaults(store: Arc<dyn ListenStore>) -> anyhow::Result<Self> {
        let cfg = EngineConfig::load_default()?;
        let registry = SourceRegistry::load_default();
        let clients: Vec<Arc<dyn AggregatorClient>> = vec![
            Arc::new(NewsDataClient::from_env(cfg.aggregator_timeout())),
            Arc::new(GNewsClient::from_env(cfg.aggregator_timeout())),
        ];
        let expander = build_expander(cfg.ai_timeout());
        Ok(Self::new(
            cfg,
            registry,
            clients,
            store,
            expander,
            Arc::new(SystemClock),
        ))
    }

    /// Start the two background loops. Idempotence is the caller's concern;
    /// call once at init.
    pub fn start(&self) {
        let health = Arc::clone(&self.health);
        let registry = Arc::clone(&self.registry);
        self.scheduler.spawn_periodic(
            "health-probe",
            Duration::from_secs(self.cfg.health_interval_secs),
            move || {
                let health = Arc::clone(&health);
                let registry = Arc::clone(&registry);
                async move { health.probe_all(&registry).await }
            },
        );

        let aggregators = Arc::clone(&self.aggregators);
        self.scheduler.spawn_periodic(
            "aggregator-refresh",
            Duration::from_secs(self.cfg.aggregator_refresh_secs),
            move || {
                let aggregators = Arc::clone(&aggregators);
                async move { aggregators.refresh_all().await }
            },
        );

        tracing::info!(
            sources = self.registry.len(),
            aggregators = self.aggregators.ids().len(),
            "engine started"
        );
    }

    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    // ------------------------------------------------------------
    // Caller-facing operations
    // ------------------------------------------------------------

    /// Fresh merged view: RSS fan-out plus (optionally) cached aggregator
    /// items, deduplicated and sorted published-desc.
    pub async fn fetch_news(
        &self,
        limit: usize,
        category: Option<&str>,
        include_aggregators: bool,
        aggregator_ids: Option<&[String]>,
    ) -> Result<Vec<NewsItem>, EngineError> {
        validate_limit(limit)?;

        let rss = fetch_all(
            &self.fetcher,
            self.registry.feeds(),
            SourceType::Rss,
            limit,
            category,
        )
        .await;

        let aggregator_items = if include_aggregators {
            self.aggregator_items(aggregator_ids).await
        } else {
            Vec::new()
        };

        let filters = SearchFilters {
            category: category.map(str::to_string),
            ..Default::default()
        };
        let page = merge(
            rss,
            aggregator_items,
            Vec::new(),
            &filters,
            &Pagination { skip: 0, limit },
        );
        Ok(page.results)
    }

    /// Filtered, ranked, paginated search over all three origin pools.
    pub async fn search_news(
        &self,
        filters: SearchFilters,
        pagination: Pagination,
    ) -> Result<SearchPage, EngineError> {
        validate_limit(pagination.limit)?;
        if pagination.skip > MAX_SKIP {
            return Err(EngineError::Validation(format!(
                "skip must be at most {MAX_SKIP}"
            )));
        }

        let rss = fetch_all(
            &self.fetcher,
            self.registry.feeds(),
            SourceType::Rss,
            SEARCH_POOL_SIZE,
            None,
        )
        .await;
        let aggregator_items = self.aggregator_items(None).await;
        let podcasts = fetch_all(
            &self.fetcher,
            self.registry.podcasts(),
            SourceType::Podcast,
            SEARCH_POOL_SIZE,
            None,
        )
        .await;

        Ok(merge(rss, aggregator_items, podcasts, &filters, &pagination))
    }

    pub async fn trending(&self) -> TrendingReport {
        let pool = self.candidate_pool().await;
        trending::extract(&pool)
    }

    pub fn source_health(&self) -> HealthReport {
        HealthReport {
            summary: self.health.summary(),
            sources: self.health.detail(),
        }
    }

    /// Fire-and-forget out-of-band health pass; returns immediately.
    pub fn refresh_source_health(&self) {
        let health = Arc::clone(&self.health);
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            health.probe_all(&registry).await;
        });
    }

    pub async fn recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<RecommendationResult, EngineError> {
        validate_limit(limit)?;
        if user_id.trim().is_empty() {
            return Err(EngineError::Validation("user_id must not be empty".into()));
        }

        let pool = self.candidate_pool().await;
        self.recommender.recommend(user_id, pool, limit).await
    }

    pub fn aggregator_status(&self) -> Vec<AggregatorStatus> {
        self.aggregators.status()
    }

    /// Per-caller admission check for the transport layer.
    pub fn admit(&self, client_key: &str) -> bool {
        self.rate_limiter.allow(client_key, self.clock.as_ref())
    }

    // ------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------

    async fn aggregator_items(&self, ids: Option<&[String]>) -> Vec<NewsItem> {
        let selected: Vec<String> = match ids {
            Some(ids) => ids.to_vec(),
            None => self.aggregators.ids().iter().map(|s| s.to_string()).collect(),
        };

        let mut out = Vec::new();
        for id in selected {
            out.extend(self.aggregators.get_or_refresh(&id).await);
        }
        out
    }

    /// Deduplicated RSS + aggregator pool used by trending and scoring.
    async fn candidate_pool(&self) -> Vec<NewsItem> {
        let rss = fetch_all(
            &self.fetcher,
            self.registry.feeds(),
            SourceType::Rss,
            CANDIDATE_POOL_SIZE,
            None,
        )
        .await;
        let aggregator_items = self.aggregator_items(None).await;

        merge(
            rss,
            aggregator_items,
            Vec::new(),
            &SearchFilters::default(),
            &Pagination {
                skip: 0,
                limit: CANDIDATE_POOL_SIZE,
            },
        )
        .results
    }
}

fn validate_limit(limit: usize) -> Result<(), EngineError> {
    if limit == 0 || limit > MAX_LIMIT {
        return Err(EngineError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_bounds() {
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(MAX_LIMIT).is_ok());
        assert!(matches!(
            validate_limit(0),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            validate_limit(MAX_LIMIT + 1),
            Err(EngineError::Validation(_))
        ));
    }
}

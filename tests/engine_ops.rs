// tests/engine_ops.rs
//! Engine facade behavior that does not need live upstreams: parameter
//! validation, health snapshots, scheduler lifecycle, and admission control.

use std::sync::Arc;
use std::time::Duration;

use newscast_engine::ai::MockExpander;
use newscast_engine::cache::SystemClock;
use newscast_engine::config::EngineConfig;
use newscast_engine::engine::{NewsEngine, MAX_LIMIT};
use newscast_engine::error::EngineError;
use newscast_engine::health::HealthStatus;
use newscast_engine::merge::{Pagination, SearchFilters};
use newscast_engine::sources::SourceRegistry;
use newscast_engine::store::MemoryStore;

/// Engine over an empty catalog and no aggregators: every operation works
/// offline and returns empty data instead of failing.
fn offline_engine() -> NewsEngine {
    NewsEngine::new(
        EngineConfig::default(),
        empty_registry(),
        Vec::new(),
        Arc::new(MemoryStore::with_capacity(100)),
        Arc::new(MockExpander { fixed: vec![] }),
        Arc::new(SystemClock),
    )
}

/// An empty catalog keeps the fetch fan-out off the network.
fn empty_registry() -> SourceRegistry {
    let f = write_empty_catalog();
    SourceRegistry::from_file(f.path()).unwrap()
}

fn write_empty_catalog() -> tempfile::NamedTempFile {
    use std::io::Write as _;
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "# empty catalog").unwrap();
    f
}

#[tokio::test]
async fn limits_are_validated() {
    let engine = offline_engine();

    assert!(matches!(
        engine.fetch_news(0, None, false, None).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.fetch_news(MAX_LIMIT + 1, None, false, None).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.recommendations("alice", 0).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.recommendations("  ", 10).await,
        Err(EngineError::Validation(_))
    ));

    let too_deep = Pagination {
        skip: 10_001,
        limit: 10,
    };
    assert!(matches!(
        engine.search_news(SearchFilters::default(), too_deep).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn offline_operations_degrade_to_empty() {
    let engine = offline_engine();

    let news = engine.fetch_news(10, None, true, None).await.unwrap();
    assert!(news.is_empty());

    let page = engine
        .search_news(SearchFilters::default(), Pagination::default())
        .await
        .unwrap();
    assert!(page.results.is_empty());
    assert_eq!(page.total, 0);

    let trending = engine.trending().await;
    assert_eq!(trending.sample_size, 0);

    // Cold-start user over an empty pool: fallback strategy, no items.
    let recs = engine.recommendations("alice", 10).await.unwrap();
    assert!(recs.items.is_empty());
}

#[tokio::test]
async fn health_snapshot_and_manual_refresh() {
    let engine = offline_engine();

    let report = engine.source_health();
    assert_eq!(report.summary.counts.total, 0);
    assert!(report.sources.is_empty());

    // Fire-and-forget must return immediately even while a pass runs.
    engine.refresh_source_health();

    // Still consistent after the out-of-band pass settles.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = engine.source_health();
    assert!(report
        .sources
        .iter()
        .all(|r| r.status != HealthStatus::Green || r.last_checked_at.is_some()));
}

#[tokio::test]
async fn background_loops_start_and_stop() {
    let engine = offline_engine();
    engine.start();
    tokio::time::sleep(Duration::from_millis(20)).await;
    engine.shutdown().await;
}

#[tokio::test]
async fn admission_control_uses_the_configured_budget() {
    let cfg: EngineConfig = toml::from_str(
        "rate_limit_window_secs = 60\nrate_limit_max_hits = 2",
    )
    .unwrap();
    let engine = NewsEngine::new(
        cfg,
        empty_registry(),
        Vec::new(),
        Arc::new(MemoryStore::with_capacity(10)),
        Arc::new(MockExpander { fixed: vec![] }),
        Arc::new(SystemClock),
    );

    assert!(engine.admit("203.0.113.9"));
    assert!(engine.admit("203.0.113.9"));
    assert!(!engine.admit("203.0.113.9"));
    assert!(engine.admit("203.0.113.10"));
}

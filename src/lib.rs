// src/lib.rs
// Public library surface: the ingestion/ranking core behind a news service.
// Transport (HTTP), TTS, and settings CRUD are external collaborators that
// hold a `NewsEngine` handle.

pub mod aggregator;
pub mod ai;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod ingest;
pub mod merge;
pub mod profile;
pub mod recommend;
pub mod scheduler;
pub mod sources;
pub mod store;
pub mod trending;

// ---- Re-exports for stable public API ----
pub use crate::config::EngineConfig;
pub use crate::engine::NewsEngine;
pub use crate::error::EngineError;
pub use crate::ingest::types::{NewsItem, SourceType};
pub use crate::merge::{Pagination, SearchFilters, SearchPage};
pub use crate::recommend::{RecommendationResult, Strategy};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR NEWSCAST_ENV in {local, development, dev})
///   - NEWSCAST_DEV_LOG=1
pub fn enable_dev_tracing() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let dev_flag = std::env::var("NEWSCAST_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("NEWSCAST_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newscast=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

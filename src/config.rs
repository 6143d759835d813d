// src/config.rs
//! Engine configuration: timeouts, cadences, TTLs, and limits.
//!
//! Load order: `$NEWSCAST_CONFIG_PATH` → `config/engine.toml` → built-in
//! defaults. Every field has a serde default so partial files are fine.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PATH: &str = "NEWSCAST_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/engine.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Per-source RSS fetch budget.
    #[serde(default = "d_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Per-aggregator upstream budget.
    #[serde(default = "d_aggregator_timeout")]
    pub aggregator_timeout_secs: u64,
    /// Per-source health probe budget.
    #[serde(default = "d_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Topic-expansion call budget.
    #[serde(default = "d_ai_timeout")]
    pub ai_timeout_secs: u64,
    /// Background health pass cadence.
    #[serde(default = "d_health_interval")]
    pub health_interval_secs: u64,
    /// Background aggregator refresh cadence.
    #[serde(default = "d_refresh_interval")]
    pub aggregator_refresh_secs: u64,
    /// Aggregator cache TTL.
    #[serde(default = "d_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Cap on items taken from a single feed per fetch.
    #[serde(default = "d_max_items")]
    pub max_items_per_feed: usize,
    #[serde(default = "d_rate_window")]
    pub rate_limit_window_secs: u64,
    #[serde(default = "d_rate_hits")]
    pub rate_limit_max_hits: usize,
}

fn d_fetch_timeout() -> u64 {
    10
}
fn d_aggregator_timeout() -> u64 {
    15
}
fn d_probe_timeout() -> u64 {
    5
}
fn d_ai_timeout() -> u64 {
    10
}
fn d_health_interval() -> u64 {
    300
}
fn d_refresh_interval() -> u64 {
    600
}
fn d_cache_ttl() -> u64 {
    600
}
fn d_max_items() -> usize {
    15
}
fn d_rate_window() -> u64 {
    60
}
fn d_rate_hits() -> usize {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        toml::from_str("").expect("defaults deserialize")
    }
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load using env var + fallbacks; defaults when no file exists.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::from_file(&pb);
            }
            return Err(anyhow!("NEWSCAST_CONFIG_PATH points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            return Self::from_file(&default_p);
        }
        Ok(Self::default())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
    pub fn aggregator_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregator_timeout_secs)
    }
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

//! # Source Registry
//!
//! Static catalog of feed sources (url, display name, category, region) plus
//! a separate podcast catalog. Loaded once at startup, immutable afterwards.
//!
//! - Built-in `default_seed()` with a multi-region mix of general, tech,
//!   business, and politics feeds.
//! - Optional TOML override via `$NEWS_SOURCES_PATH`, fallback
//!   `config/sources.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "NEWS_SOURCES_PATH";
const DEFAULT_PATH: &str = "config/sources.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub display_name: String,
    pub category: String,
    pub region: String,
}

impl FeedSource {
    fn new(url: &str, display_name: &str, category: &str, region: &str) -> Self {
        Self {
            url: url.to_string(),
            display_name: display_name.to_string(),
            category: category.to_string(),
            region: region.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    feeds: Vec<FeedSource>,
    podcasts: Vec<FeedSource>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    source: Vec<FeedSource>,
    #[serde(default)]
    podcast: Vec<FeedSource>,
}

impl SourceRegistry {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading source catalog from {}", path.display()))?;
        let parsed: RegistryFile =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self {
            feeds: parsed.source,
            podcasts: parsed.podcast,
        })
    }

    /// Load using env var + file fallback; built-in seed when neither exists.
    pub fn load_default() -> Self {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            match Self::from_file(&pb) {
                Ok(reg) => return reg,
                Err(e) => {
                    tracing::warn!(error = ?e, "source catalog from env failed; using seed")
                }
            }
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            if let Ok(reg) = Self::from_file(&default_p) {
                return reg;
            }
        }
        Self::default_seed()
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    pub fn podcasts(&self) -> &[FeedSource] {
        &self.podcasts
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Built-in catalog used when no TOML override is present.
    pub(crate) fn default_seed() -> Self {
        let feeds = vec![
            FeedSource::new(
                "https://feeds.bbci.co.uk/news/world/rss.xml",
                "BBC World",
                "general",
                "global",
            ),
            FeedSource::new(
                "https://www.theguardian.com/world/rss",
                "The Guardian",
                "general",
                "europe",
            ),
            FeedSource::new(
                "https://feeds.npr.org/1001/rss.xml",
                "NPR News",
                "general",
                "us",
            ),
            FeedSource::new(
                "https://rss.cnn.com/rss/edition.rss",
                "CNN International",
                "general",
                "us",
            ),
            FeedSource::new(
                "https://www.aljazeera.com/xml/rss/all.xml",
                "Al Jazeera",
                "general",
                "mena",
            ),
            FeedSource::new(
                "https://www.france24.com/en/rss",
                "France 24",
                "general",
                "europe",
            ),
            FeedSource::new("https://techcrunch.com/feed/", "TechCrunch", "tech", "us"),
            FeedSource::new(
                "https://feeds.arstechnica.com/arstechnica/index",
                "Ars Technica",
                "tech",
                "us",
            ),
            FeedSource::new(
                "https://www.theverge.com/rss/index.xml",
                "The Verge",
                "tech",
                "us",
            ),
            FeedSource::new("https://www.wired.com/feed/rss", "Wired", "tech", "us"),
            FeedSource::new(
                "https://www.cnbc.com/id/100003114/device/rss/rss.html",
                "CNBC",
                "business",
                "us",
            ),
            FeedSource::new(
                "https://www.politico.com/rss/politicopicks.xml",
                "Politico",
                "politics",
                "us",
            ),
        ];

        let podcasts = vec![
            FeedSource::new(
                "https://feeds.npr.org/510318/podcast.xml",
                "NPR Up First",
                "general",
                "us",
            ),
            FeedSource::new(
                "https://feeds.simplecast.com/54nAGcIl",
                "The Daily",
                "general",
                "us",
            ),
        ];

        Self { feeds, podcasts }
    }
}

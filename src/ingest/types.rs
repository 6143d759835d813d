// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin discriminant; every item is tagged at the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    Aggregator,
    Podcast,
}

/// One normalized news item, immutable within a fetch cycle.
///
/// `id` is a content hash of link+title, unique within any merged pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source_name: String,
    pub source_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category: String,
    pub region: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source_type: SourceType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregator_tag: Option<String>,
}

impl NewsItem {
    /// Stable id: first 16 hex chars of sha256(link + title).
    pub fn content_id(link: &str, title: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(link.as_bytes());
        hasher.update(title.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(16);
        for b in digest.iter().take(8) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    /// Age in whole seconds relative to `now_unix`; `None` when unpublished
    /// or dated in the future.
    pub fn age_secs(&self, now_unix: u64) -> Option<u64> {
        let ts = self.published_at?.timestamp();
        let ts = u64::try_from(ts).ok()?;
        (ts <= now_unix).then(|| now_unix - ts)
    }
}

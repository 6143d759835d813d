// src/ingest/rss.rs
//! RSS/Atom adapter: fetch one source, normalize into `NewsItem`s.
//!
//! The contract is "never raise": any network, timeout, or parse failure
//! yields an empty slice plus a logged warning, so one broken source cannot
//! poison a fetch pass.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{NewsItem, SourceType};
use crate::ingest::{normalize_summary, normalize_title};
use crate::sources::FeedSource;

// --- RSS 2.0 wire shapes ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "category", default)]
    categories: Vec<TextNode>,
    #[serde(rename = "enclosure", default)]
    enclosures: Vec<Enclosure>,
    #[serde(rename = "media:content", default)]
    media_content: Vec<MediaContent>,
}

/// Element that may carry attributes besides its text (e.g.
/// `<category domain="...">Economy</category>`, `<title type="html">`).
#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text")]
    value: Option<String>,
}
#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}
#[derive(Debug, Deserialize)]
struct MediaContent {
    #[serde(rename = "@url")]
    url: Option<String>,
}

// --- Atom wire shapes (several catalog feeds are Atom, not RSS) ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
    published: Option<String>,
    updated: Option<String>,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// RFC2822 first (RSS convention, obsolete zone names included), then
/// RFC3339 (Atom convention).
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_items: usize,
}

impl FeedFetcher {
    pub fn new(timeout: Duration, max_items: usize) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("newscast-engine/0.1 (+https://github.com/newscast/newscast-engine)")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            client,
            timeout,
            max_items,
        }
    }

    /// Fetch and normalize one source. Infallible by contract.
    pub async fn fetch(&self, source: &FeedSource, origin: SourceType) -> Vec<NewsItem> {
        // The outer timeout bounds the whole call even when the client-level
        // timeout is generous; abandonment counts as failure.
        let attempt = tokio::time::timeout(self.timeout, self.fetch_inner(source, origin));
        match attempt.await {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, source = %source.display_name, "feed fetch failed");
                counter!("feed_fetch_errors_total").increment(1);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(source = %source.display_name, "feed fetch timed out");
                counter!("feed_fetch_errors_total").increment(1);
                Vec::new()
            }
        }
    }

    async fn fetch_inner(&self, source: &FeedSource, origin: SourceType) -> Result<Vec<NewsItem>> {
        let resp = self
            .client
            .get(&source.url)
            .send()
            .await
            .with_context(|| format!("GET {}", source.url))?;
        let resp = resp.error_for_status().context("feed returned error status")?;
        let body = resp.text().await.context("reading feed body")?;
        parse_feed(&body, source, origin, self.max_items)
    }
}

/// Parse a feed payload, trying RSS 2.0 first, then Atom.
pub fn parse_feed(
    body: &str,
    source: &FeedSource,
    origin: SourceType,
    max_items: usize,
) -> Result<Vec<NewsItem>> {
    let t0 = std::time::Instant::now();

    let items = match from_str::<Rss>(body) {
        Ok(rss) => rss
            .channel
            .item
            .into_iter()
            .filter_map(|it| rss_item(it, source, origin))
            .take(max_items)
            .collect::<Vec<_>>(),
        Err(rss_err) => {
            let feed: AtomFeed = from_str(body)
                .map_err(|atom_err| {
                    anyhow::anyhow!("not RSS ({rss_err}) nor Atom ({atom_err})")
                })
                .context("parsing feed xml")?;
            feed.entry
                .into_iter()
                .filter_map(|e| atom_entry(e, source, origin))
                .take(max_items)
                .collect()
        }
    };

    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("feed_items_total").increment(items.len() as u64);
    Ok(items)
}

fn rss_item(it: Item, source: &FeedSource, origin: SourceType) -> Option<NewsItem> {
    let title = normalize_title(it.title.as_deref().unwrap_or_default());
    let link = it.link.unwrap_or_default();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    // Image fallback chain: media:content url -> first enclosure -> none.
    let image_url = it
        .media_content
        .into_iter()
        .find_map(|m| m.url)
        .or_else(|| it.enclosures.into_iter().find_map(|e| e.url));

    Some(NewsItem {
        id: NewsItem::content_id(&link, &title),
        title,
        summary: normalize_summary(it.description.as_deref().unwrap_or_default()),
        source_name: source.display_name.clone(),
        source_url: link,
        image_url,
        published_at: it.pub_date.as_deref().and_then(parse_feed_date),
        category: source.category.clone(),
        region: source.region.clone(),
        tags: it
            .categories
            .into_iter()
            .filter_map(|c| c.value)
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect(),
        source_type: origin,
        aggregator_tag: None,
    })
}

fn atom_entry(e: AtomEntry, source: &FeedSource, origin: SourceType) -> Option<NewsItem> {
    let title = normalize_title(
        e.title
            .and_then(|t| t.value)
            .as_deref()
            .unwrap_or_default(),
    );
    // Prefer rel="alternate"; fall back to the first link with an href.
    let link = e
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate") && l.href.is_some())
        .or_else(|| e.links.iter().find(|l| l.href.is_some()))
        .and_then(|l| l.href.clone())
        .unwrap_or_default();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let summary_src = e
        .summary
        .and_then(|t| t.value)
        .or_else(|| e.content.and_then(|t| t.value))
        .unwrap_or_default();
    let published = e.published.or(e.updated);

    Some(NewsItem {
        id: NewsItem::content_id(&link, &title),
        title,
        summary: normalize_summary(&summary_src),
        source_name: source.display_name.clone(),
        source_url: link,
        image_url: None,
        published_at: published.as_deref().and_then(parse_feed_date),
        category: source.category.clone(),
        region: source.region.clone(),
        tags: Vec::new(),
        source_type: origin,
        aggregator_tag: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> FeedSource {
        FeedSource {
            url: "https://wire.test/rss".into(),
            display_name: "Wire".into(),
            category: "general".into(),
            region: "global".into(),
        }
    }

    const RSS_FIXTURE: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Wire</title>
    <item>
      <title>Rates &amp; markets steady</title>
      <link>https://wire.test/a</link>
      <pubDate>Tue, 04 Aug 2026 09:30:00 GMT</pubDate>
      <description><![CDATA[<p>Central bank holds; <b>markets</b> steady.</p>]]></description>
      <category>Economy</category>
      <media:content url="https://wire.test/a.jpg" type="image/jpeg"/>
    </item>
    <item>
      <title>Untitled link missing</title>
    </item>
  </channel>
</rss>"#;

    const ATOM_FIXTURE: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Verge-ish</title>
  <entry>
    <title>New headset reviewed</title>
    <link rel="alternate" href="https://atom.test/h"/>
    <summary>Hands on with the headset.</summary>
    <published>2026-08-04T10:00:00Z</published>
  </entry>
</feed>"#;

    #[test]
    fn rss_items_normalize_and_skip_broken() {
        let items = parse_feed(RSS_FIXTURE, &src(), SourceType::Rss, 15).unwrap();
        assert_eq!(items.len(), 1);

        let it = &items[0];
        assert_eq!(it.title, "Rates & markets steady");
        assert_eq!(it.summary, "Central bank holds; markets steady.");
        assert_eq!(it.image_url.as_deref(), Some("https://wire.test/a.jpg"));
        assert_eq!(it.tags, vec!["economy"]);
        assert!(it.published_at.is_some());
        assert_eq!(it.source_type, SourceType::Rss);
    }

    #[test]
    fn atom_entries_parse_with_rfc3339_dates() {
        let items = parse_feed(ATOM_FIXTURE, &src(), SourceType::Rss, 15).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_url, "https://atom.test/h");
        assert!(items[0].published_at.is_some());
    }

    #[test]
    fn malformed_xml_is_an_error_not_a_panic() {
        assert!(parse_feed("this is not xml", &src(), SourceType::Rss, 15).is_err());
    }

    #[test]
    fn item_cap_applies() {
        let many: String = (0..30)
            .map(|i| {
                format!(
                    "<item><title>Story {i}</title><link>https://wire.test/{i}</link></item>"
                )
            })
            .collect();
        let xml = format!("<rss><channel>{many}</channel></rss>");
        let items = parse_feed(&xml, &src(), SourceType::Rss, 15).unwrap();
        assert_eq!(items.len(), 15);
    }

    #[test]
    fn feed_dates_accept_both_conventions() {
        assert!(parse_feed_date("Tue, 04 Aug 2026 09:30:00 GMT").is_some());
        assert!(parse_feed_date("2026-08-04T09:30:00Z").is_some());
        assert!(parse_feed_date("yesterday-ish").is_none());
    }
}

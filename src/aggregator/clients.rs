// src/aggregator/clients.rs
//! Upstream aggregation API clients. Two providers in the keyword/country
//! JSON mold; a missing API key disables a provider without error.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::ingest::types::{NewsItem, SourceType};
use crate::ingest::{normalize_summary, normalize_title};

#[async_trait]
pub trait AggregatorClient: Send + Sync {
    fn id(&self) -> &'static str;
    /// False when no API key was provided; such a client is skipped silently.
    fn configured(&self) -> bool;
    async fn fetch_latest(&self) -> Result<Vec<NewsItem>>;
}

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("newscast-engine/0.1 (+https://github.com/newscast/newscast-engine)")
        .connect_timeout(Duration::from_secs(4))
        .timeout(timeout)
        .build()
        .expect("reqwest client")
}

// ------------------------------------------------------------
// newsdata.io-style provider
// ------------------------------------------------------------

pub struct NewsDataClient {
    http: reqwest::Client,
    api_key: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    #[serde(default)]
    results: Vec<NewsDataArticle>,
}
#[derive(Debug, Deserialize)]
struct NewsDataArticle {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    category: Vec<String>,
    #[serde(default)]
    country: Vec<String>,
    source_id: Option<String>,
}

impl NewsDataClient {
    pub const ID: &'static str = "newsdata";

    pub fn from_env(timeout: Duration) -> Self {
        Self {
            http: build_http(timeout),
            api_key: std::env::var("NEWSDATA_API_KEY").unwrap_or_default(),
            country: std::env::var("NEWSDATA_COUNTRY").unwrap_or_else(|_| "us".to_string()),
        }
    }
}

#[async_trait]
impl AggregatorClient for NewsDataClient {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        let resp = self
            .http
            .get("https://newsdata.io/api/1/latest")
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("country", self.country.as_str()),
                ("language", "en"),
            ])
            .send()
            .await
            .context("newsdata request")?;
        let resp = resp.error_for_status().context("newsdata status")?;
        let body: NewsDataResponse = resp.json().await.context("newsdata json")?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|a| {
                let title = normalize_title(a.title.as_deref().unwrap_or_default());
                let link = a.link.unwrap_or_default();
                if title.is_empty() || link.is_empty() {
                    return None;
                }
                Some(NewsItem {
                    id: NewsItem::content_id(&link, &title),
                    title,
                    summary: normalize_summary(a.description.as_deref().unwrap_or_default()),
                    source_name: a
                        .source_id
                        .unwrap_or_else(|| "newsdata".to_string()),
                    source_url: link,
                    image_url: a.image_url,
                    published_at: a.pub_date.as_deref().and_then(parse_newsdata_date),
                    category: a
                        .category
                        .first()
                        .map(|c| c.to_lowercase())
                        .unwrap_or_else(|| "general".to_string()),
                    region: a
                        .country
                        .first()
                        .map(|c| c.to_lowercase())
                        .unwrap_or_else(|| "global".to_string()),
                    tags: a.category.into_iter().map(|c| c.to_lowercase()).collect(),
                    source_type: SourceType::Aggregator,
                    aggregator_tag: Some(Self::ID.to_string()),
                })
            })
            .collect())
    }
}

/// newsdata.io uses `YYYY-MM-DD HH:MM:SS` in UTC, not a standard format.
fn parse_newsdata_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

// ------------------------------------------------------------
// gnews.io-style provider
// ------------------------------------------------------------

pub struct GNewsClient {
    http: reqwest::Client,
    api_key: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
}
#[derive(Debug, Deserialize)]
struct GNewsArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    image: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    source: Option<GNewsSource>,
}
#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

impl GNewsClient {
    pub const ID: &'static str = "gnews";

    pub fn from_env(timeout: Duration) -> Self {
        Self {
            http: build_http(timeout),
            api_key: std::env::var("GNEWS_API_KEY").unwrap_or_default(),
            country: std::env::var("GNEWS_COUNTRY").unwrap_or_else(|_| "us".to_string()),
        }
    }
}

#[async_trait]
impl AggregatorClient for GNewsClient {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn fetch_latest(&self) -> Result<Vec<NewsItem>> {
        let resp = self
            .http
            .get("https://gnews.io/api/v4/top-headlines")
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("country", self.country.as_str()),
                ("lang", "en"),
                ("max", "10"),
            ])
            .send()
            .await
            .context("gnews request")?;
        let resp = resp.error_for_status().context("gnews status")?;
        let body: GNewsResponse = resp.json().await.context("gnews json")?;

        Ok(body
            .articles
            .into_iter()
            .filter_map(|a| {
                let title = normalize_title(a.title.as_deref().unwrap_or_default());
                let link = a.url.unwrap_or_default();
                if title.is_empty() || link.is_empty() {
                    return None;
                }
                Some(NewsItem {
                    id: NewsItem::content_id(&link, &title),
                    title,
                    summary: normalize_summary(a.description.as_deref().unwrap_or_default()),
                    source_name: a
                        .source
                        .and_then(|s| s.name)
                        .unwrap_or_else(|| "gnews".to_string()),
                    source_url: link,
                    image_url: a.image,
                    published_at: a
                        .published_at
                        .as_deref()
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                        .map(|dt| dt.with_timezone(&Utc)),
                    category: "general".to_string(),
                    region: self.country.to_lowercase(),
                    tags: Vec::new(),
                    source_type: SourceType::Aggregator,
                    aggregator_tag: Some(Self::ID.to_string()),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newsdata_date_format_parses() {
        let dt = parse_newsdata_date("2026-08-04 10:15:00").unwrap();
        assert_eq!(
            dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2026-08-04 10:15:00"
        );
        assert!(parse_newsdata_date("2026-08-04T10:15:00Z").is_none());
    }

    #[test]
    fn newsdata_payload_maps_to_items() {
        let raw = r#"{
            "status": "success",
            "results": [
                {"title": "Grid upgrade approved", "link": "https://nd.test/1",
                 "description": "Regulators sign off.", "pubDate": "2026-08-04 09:00:00",
                 "category": ["Business"], "country": ["us"], "source_id": "wire"}
            ]
        }"#;
        let parsed: NewsDataResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].category, vec!["Business"]);
    }

    #[test]
    fn gnews_payload_tolerates_missing_fields() {
        let raw = r#"{"totalArticles": 2, "articles": [
            {"title": "A", "url": "https://g.test/a", "publishedAt": "2026-08-04T09:00:00Z"},
            {"description": "no title or url"}
        ]}"#;
        let parsed: GNewsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.articles.len(), 2);
        assert!(parsed.articles[1].title.is_none());
    }
}

// src/merge.rs
//! # Merge & Dedup Engine
//! Combines RSS, aggregator, and podcast items into one pool, then
//! deduplicates, filters, sorts, and paginates.
//!
//! Dedup key is the item id; the first occurrence wins. With a free-text
//! query, items whose title matches rank above items matching only in
//! summary/source/tags, tie-broken by published-date descending.

use serde::{Deserialize, Serialize};

use crate::ingest::sort_published_desc;
use crate::ingest::types::{NewsItem, SourceType};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub source: Option<String>,
    pub source_type: Option<SourceType>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_page_limit")]
    pub limit: usize,
}

fn default_page_limit() -> usize {
    20
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_page_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub results: Vec<NewsItem>,
    /// Pre-pagination filtered count.
    pub total: usize,
}

/// Merge the three origin pools into one filtered, ranked, paginated page.
pub fn merge(
    rss: Vec<NewsItem>,
    aggregator: Vec<NewsItem>,
    podcast: Vec<NewsItem>,
    filters: &SearchFilters,
    pagination: &Pagination,
) -> SearchPage {
    let mut pool = Vec::with_capacity(rss.len() + aggregator.len() + podcast.len());
    let mut seen = std::collections::HashSet::with_capacity(pool.capacity());

    for item in rss.into_iter().chain(aggregator).chain(podcast) {
        if seen.insert(item.id.clone()) {
            pool.push(item);
        }
    }

    pool.retain(|item| matches_filters(item, filters));
    let total = pool.len();

    match filters.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => rank_for_query(&mut pool, q),
        None => sort_published_desc(&mut pool),
    }

    let results = pool
        .into_iter()
        .skip(pagination.skip)
        .take(pagination.limit)
        .collect();

    SearchPage { results, total }
}

fn matches_filters(item: &NewsItem, filters: &SearchFilters) -> bool {
    if let Some(cat) = &filters.category {
        if !item.category.eq_ignore_ascii_case(cat) {
            return false;
        }
    }
    if let Some(source) = &filters.source {
        if !item.source_name.eq_ignore_ascii_case(source) {
            return false;
        }
    }
    if let Some(st) = filters.source_type {
        if item.source_type != st {
            return false;
        }
    }
    if let Some(q) = filters.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        if !matches_query(item, q) {
            return false;
        }
    }
    true
}

fn matches_query(item: &NewsItem, query: &str) -> bool {
    let q = query.to_lowercase();
    title_matches(item, &q)
        || item.summary.to_lowercase().contains(&q)
        || item.source_name.to_lowercase().contains(&q)
        || item.tags.iter().any(|t| t.to_lowercase().contains(&q))
}

/// `query` must already be lowercased.
fn title_matches(item: &NewsItem, query: &str) -> bool {
    item.title.to_lowercase().contains(query)
}

/// Title-match is the primary boolean key; published-desc breaks ties.
fn rank_for_query(pool: &mut [NewsItem], query: &str) {
    let q = query.to_lowercase();
    sort_published_desc(pool);
    pool.sort_by_key(|item| !title_matches(item, &q));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, title: &str, category: &str, st: SourceType, day: u32) -> NewsItem {
        NewsItem {
            id: id.to_string(),
            title: title.to_string(),
            summary: format!("summary for {title}"),
            source_name: "Wire".into(),
            source_url: format!("https://wire.test/{id}"),
            image_url: None,
            published_at: Some(Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap()),
            category: category.to_string(),
            region: "global".into(),
            tags: Vec::new(),
            source_type: st,
            aggregator_tag: None,
        }
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let a = item("dup", "From RSS", "general", SourceType::Rss, 3);
        let b = item("dup", "From aggregator", "general", SourceType::Aggregator, 3);

        let page = merge(
            vec![a],
            vec![b],
            vec![],
            &SearchFilters::default(),
            &Pagination::default(),
        );
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].title, "From RSS");
    }

    #[test]
    fn filters_compose_and_are_idempotent() {
        let pool = vec![
            item("1", "Chip fabs expand", "tech", SourceType::Rss, 4),
            item("2", "Chip tariffs debated", "politics", SourceType::Rss, 3),
            item("3", "Weekly podcast roundup", "tech", SourceType::Podcast, 2),
        ];
        let filters = SearchFilters {
            category: Some("TECH".into()),
            source_type: Some(SourceType::Rss),
            ..Default::default()
        };

        let once = merge(
            pool.clone(),
            vec![],
            vec![],
            &filters,
            &Pagination::default(),
        );
        assert_eq!(once.total, 1);
        assert_eq!(once.results[0].id, "1");

        let twice = merge(
            once.results.clone(),
            vec![],
            vec![],
            &filters,
            &Pagination::default(),
        );
        assert_eq!(twice.results, once.results);
    }

    #[test]
    fn title_hits_rank_above_other_hits() {
        let title_hit_old = item("t", "Quantum breakthrough claimed", "tech", SourceType::Rss, 1);
        let mut summary_hit_new = item("s", "Research roundup", "tech", SourceType::Rss, 5);
        summary_hit_new.summary = "A quantum result dominates the cycle".into();

        let page = merge(
            vec![summary_hit_new, title_hit_old],
            vec![],
            vec![],
            &SearchFilters {
                query: Some("quantum".into()),
                ..Default::default()
            },
            &Pagination::default(),
        );
        assert_eq!(page.total, 2);
        // Older title hit still outranks the newer summary-only hit.
        assert_eq!(page.results[0].id, "t");
        assert_eq!(page.results[1].id, "s");
    }

    #[test]
    fn pagination_reports_prepagination_total() {
        let pool: Vec<_> = (1..=7)
            .map(|i| item(&i.to_string(), &format!("Story {i}"), "general", SourceType::Rss, i as u32))
            .collect();

        let page = merge(
            pool,
            vec![],
            vec![],
            &SearchFilters::default(),
            &Pagination { skip: 5, limit: 5 },
        );
        assert_eq!(page.total, 7);
        assert_eq!(page.results.len(), 2);
    }
}

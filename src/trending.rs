// src/trending.rs
//! Category and title-keyword frequency counts over a merged pool.

use std::collections::HashMap;

use serde::Serialize;

use crate::ingest::tokenize_keywords;
use crate::ingest::types::NewsItem;

const TOP_N: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TrendingReport {
    pub categories: Vec<(String, usize)>,
    pub keywords: Vec<(String, usize)>,
    pub sample_size: usize,
}

pub fn extract(pool: &[NewsItem]) -> TrendingReport {
    let mut categories: HashMap<String, usize> = HashMap::new();
    let mut keywords: HashMap<String, usize> = HashMap::new();

    for item in pool {
        *categories.entry(item.category.to_lowercase()).or_default() += 1;
        for token in tokenize_keywords(&item.title) {
            *keywords.entry(token).or_default() += 1;
        }
    }

    TrendingReport {
        categories: top_n(categories),
        keywords: top_n(keywords),
        sample_size: pool.len(),
    }
}

/// Count-desc, ties alphabetical, for stable output.
fn top_n(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut out: Vec<_> = counts.into_iter().collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.truncate(TOP_N);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceType;

    fn item(title: &str, category: &str) -> NewsItem {
        NewsItem {
            id: NewsItem::content_id(title, title),
            title: title.to_string(),
            summary: String::new(),
            source_name: "Wire".into(),
            source_url: "https://wire.test".into(),
            image_url: None,
            published_at: None,
            category: category.to_string(),
            region: "global".into(),
            tags: Vec::new(),
            source_type: SourceType::Rss,
            aggregator_tag: None,
        }
    }

    #[test]
    fn counts_categories_and_keywords() {
        let pool = vec![
            item("Election results certified", "politics"),
            item("Election turnout surges", "politics"),
            item("Chip plant opens", "tech"),
        ];

        let report = extract(&pool);
        assert_eq!(report.sample_size, 3);
        assert_eq!(report.categories[0], ("politics".to_string(), 2));
        assert_eq!(report.keywords[0], ("election".to_string(), 2));
    }

    #[test]
    fn empty_pool_yields_empty_report() {
        let report = extract(&[]);
        assert_eq!(report.sample_size, 0);
        assert!(report.categories.is_empty());
        assert!(report.keywords.is_empty());
    }
}

// src/ingest/mod.rs
pub mod rss;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::ingest::rss::FeedFetcher;
use crate::ingest::types::{NewsItem, SourceType};
use crate::sources::FeedSource;

/// Summary text cap after HTML stripping.
pub const SUMMARY_MAX_CHARS: usize = 500;
/// Title cap.
pub const TITLE_MAX_CHARS: usize = 300;
/// Loose dedup window over the merged fetch: first N lowercased title chars.
pub const TITLE_DEDUP_PREFIX_CHARS: usize = 50;

/// One-time metrics registration (so series show up on the exporter side).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_items_total", "Items parsed from feed sources.");
        describe_counter!(
            "feed_fetch_errors_total",
            "Feed fetches that failed (network/timeout/parse)."
        );
        describe_counter!(
            "feed_dedup_total",
            "Items removed by title-prefix deduplication."
        );
        describe_histogram!("feed_parse_ms", "Feed parse time in milliseconds.");
    });
}

/// Strip HTML, decode entities, collapse whitespace, cap length.
pub fn normalize_summary(raw: &str) -> String {
    let mut out = html_escape::decode_html_entities(raw).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > SUMMARY_MAX_CHARS {
        out = out.chars().take(SUMMARY_MAX_CHARS).collect();
    }
    out
}

/// Single-line, whitespace-collapsed, length-capped title.
pub fn normalize_title(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let mut out = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if out.chars().count() > TITLE_MAX_CHARS {
        out = out.chars().take(TITLE_MAX_CHARS).collect();
    }
    out
}

/// Lowercased word tokens with stop-words and short tokens (len <= 3) removed.
/// Shared by the profile builder and the trending extractor.
pub fn tokenize_keywords(text: &str) -> Vec<String> {
    static RE_WORD: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE_WORD.get_or_init(|| regex::Regex::new(r"(?u)\b\w+\b").unwrap());

    re.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() > 3 && !is_stop_word(t))
        .collect()
}

fn is_stop_word(token: &str) -> bool {
    // Only words longer than three chars need listing; shorter ones are
    // dropped by the length filter.
    const STOP_WORDS: &[&str] = &[
        "about", "after", "again", "against", "also", "amid", "been", "being", "between", "could",
        "does", "doing", "down", "during", "each", "every", "from", "have", "having", "here",
        "into", "just", "like", "live", "more", "most", "news", "only", "other", "over", "report",
        "reports", "said", "says", "should", "some", "such", "than", "that", "their", "them",
        "then", "there", "these", "they", "this", "those", "through", "today", "under", "until",
        "update", "updates", "very", "week", "were", "what", "when", "where", "which", "while",
        "will", "with", "would", "year", "years", "your",
    ];
    STOP_WORDS.contains(&token)
}

/// Sort published-desc; undated items sink to the end.
pub fn sort_published_desc(items: &mut [NewsItem]) {
    items.sort_by(|a, b| match (b.published_at, a.published_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

/// Loose dedup: first occurrence of each lowercased title prefix wins.
pub fn dedup_by_title_prefix(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut kept = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for item in items {
        let prefix: String = item
            .title
            .to_lowercase()
            .chars()
            .take(TITLE_DEDUP_PREFIX_CHARS)
            .collect();
        if seen.insert(prefix) {
            kept.push(item);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        counter!("feed_dedup_total").increment(dropped as u64);
    }
    kept
}

/// Fan `fetch` out concurrently over the catalog; merge whatever succeeded.
///
/// One broken source cannot stall or fail the pass: each fetch carries its
/// own timeout and a failure contributes an empty slice.
pub async fn fetch_all(
    fetcher: &Arc<FeedFetcher>,
    sources: &[FeedSource],
    origin: SourceType,
    limit: usize,
    category: Option<&str>,
) -> Vec<NewsItem> {
    ensure_metrics_described();

    let mut tasks = JoinSet::new();
    for source in sources {
        let fetcher = Arc::clone(fetcher);
        let source = source.clone();
        tasks.spawn(async move { fetcher.fetch(&source, origin).await });
    }

    let mut merged = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(mut items) => merged.append(&mut items),
            Err(e) => tracing::warn!(error = ?e, "feed fetch task panicked"),
        }
    }

    if let Some(cat) = category {
        merged.retain(|it| it.category.eq_ignore_ascii_case(cat));
    }

    sort_published_desc(&mut merged);
    let mut deduped = dedup_by_title_prefix(merged);
    deduped.truncate(limit);
    deduped
}

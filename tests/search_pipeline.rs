// tests/search_pipeline.rs
//! Offline pipeline: parse real-shaped fixtures, merge the three origin
//! pools, search, and extract trending counts.

use newscast_engine::ingest::rss::parse_feed;
use newscast_engine::ingest::types::SourceType;
use newscast_engine::merge::{merge, Pagination, SearchFilters};
use newscast_engine::sources::FeedSource;
use newscast_engine::trending;

fn source(name: &str, category: &str) -> FeedSource {
    FeedSource {
        url: format!("https://{name}.test/rss"),
        display_name: name.to_string(),
        category: category.to_string(),
        region: "global".to_string(),
    }
}

const NEWS_XML: &str = r#"<rss version="2.0"><channel>
  <item>
    <title>Grid storage hits record capacity</title>
    <link>https://wire.test/grid</link>
    <pubDate>Wed, 05 Aug 2026 08:00:00 GMT</pubDate>
    <description>Utility-scale batteries keep growing.</description>
  </item>
  <item>
    <title>Storage startups raise new rounds</title>
    <link>https://wire.test/startups</link>
    <pubDate>Tue, 04 Aug 2026 08:00:00 GMT</pubDate>
    <description>Funding follows the grid storage boom.</description>
  </item>
</channel></rss>"#;

const POD_XML: &str = r#"<rss version="2.0"><channel>
  <item>
    <title>Daily briefing: storage wars</title>
    <link>https://pod.test/ep1</link>
    <pubDate>Wed, 05 Aug 2026 05:00:00 GMT</pubDate>
    <description>Audio rundown of the storage story.</description>
    <enclosure url="https://pod.test/ep1.mp3" type="audio/mpeg" length="1234"/>
  </item>
</channel></rss>"#;

#[test]
fn parsed_pools_merge_search_and_trend() {
    let news = parse_feed(NEWS_XML, &source("wire", "tech"), SourceType::Rss, 15).unwrap();
    let pods = parse_feed(POD_XML, &source("pod", "tech"), SourceType::Podcast, 15).unwrap();
    assert_eq!(news.len(), 2);
    assert_eq!(pods.len(), 1);
    // Podcast enclosures feed the image fallback chain.
    assert_eq!(pods[0].image_url.as_deref(), Some("https://pod.test/ep1.mp3"));
    assert_eq!(pods[0].source_type, SourceType::Podcast);

    // Free-text search across both pools: title hits first, then recency.
    let page = merge(
        news.clone(),
        Vec::new(),
        pods.clone(),
        &SearchFilters {
            query: Some("storage".into()),
            ..Default::default()
        },
        &Pagination::default(),
    );
    assert_eq!(page.total, 3);
    assert_eq!(page.results[0].source_url, "https://wire.test/grid");

    // Origin filter composes with the query.
    let pods_only = merge(
        news.clone(),
        Vec::new(),
        pods,
        &SearchFilters {
            query: Some("storage".into()),
            source_type: Some(SourceType::Podcast),
            ..Default::default()
        },
        &Pagination::default(),
    );
    assert_eq!(pods_only.total, 1);
    assert_eq!(pods_only.results[0].source_name, "pod");

    let report = trending::extract(&page.results);
    assert_eq!(report.sample_size, 3);
    assert_eq!(report.categories[0].0, "tech");
    assert!(report
        .keywords
        .iter()
        .any(|(token, count)| token == "storage" && *count == 3));
}

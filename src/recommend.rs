// src/recommend.rs
//! # Recommendation Scorer
//! Ranks a candidate pool against a decayed interest profile plus
//! AI-expanded topics.
//!
//! The weights are fixed heuristics, documented as tunable constants; this
//! is not a learned model. Strategy selection: an empty history short-circuits
//! to a trending fallback; otherwise the hybrid path scores every candidate
//! that the user has not recently consumed.

use std::collections::HashSet;
use std::sync::Arc;

use metrics::counter;
use serde::Serialize;

use crate::ai::{SharedExpander, TopicSeed, MAX_TOPICS};
use crate::cache::Clock;
use crate::error::EngineError;
use crate::ingest::types::NewsItem;
use crate::profile::{ProfileBuilder, UserProfile};
use crate::store::ListenStore;

// --- Scoring constants (tunable) ---
pub const W_CATEGORY: f32 = 40.0;
pub const W_SOURCE: f32 = 20.0;
pub const W_KEYWORD_HIT: f32 = 5.0;
pub const KEYWORD_SCORE_CAP: f32 = 20.0;
pub const W_INTEREST: f32 = 15.0;
pub const W_TOPIC: f32 = 8.0;
pub const W_FRESH_6H: f32 = 10.0;
pub const W_FRESH_24H: f32 = 5.0;

/// Track ids from this many most recent events are never recommended back.
pub const EXCLUSION_WINDOW: usize = 30;
/// Minimum history before spending an AI call on topic expansion.
pub const MIN_HISTORY_FOR_EXPANSION: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    TrendingFallback,
    HybridCollaborativeAi,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem {
    pub item: NewsItem,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub top_categories: Vec<String>,
    pub top_sources: Vec<String>,
    pub expanded_topics: Vec<String>,
    pub history_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResult {
    pub items: Vec<ScoredItem>,
    pub strategy: Strategy,
    pub profile_summary: Option<ProfileSummary>,
}

pub struct Recommender {
    store: Arc<dyn ListenStore>,
    profiles: ProfileBuilder,
    expander: SharedExpander,
    clock: Arc<dyn Clock>,
}

impl Recommender {
    pub fn new(
        store: Arc<dyn ListenStore>,
        expander: SharedExpander,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let profiles = ProfileBuilder::new(Arc::clone(&store), Arc::clone(&clock));
        Self {
            store,
            profiles,
            expander,
            clock,
        }
    }

    pub async fn recommend(
        &self,
        user_id: &str,
        pool: Vec<NewsItem>,
        limit: usize,
    ) -> Result<RecommendationResult, EngineError> {
        counter!("recommend_requests_total").increment(1);

        let profile = self.profiles.build(user_id).await?;

        // Cold start: nothing to score against, serve the trending pool as-is.
        if profile.history_count == 0 {
            return Ok(RecommendationResult {
                items: pool
                    .into_iter()
                    .take(limit)
                    .map(|item| ScoredItem { item, score: 0.0 })
                    .collect(),
                strategy: Strategy::TrendingFallback,
                profile_summary: None,
            });
        }

        let expanded_topics = if profile.history_count >= MIN_HISTORY_FOR_EXPANSION {
            let seed = TopicSeed {
                categories: profile.top_categories(3),
                keywords: profile.keywords.iter().take(5).cloned().collect(),
                interests: profile.interests.clone(),
            };
            let mut topics = self.expander.expand(&seed).await;
            topics.truncate(MAX_TOPICS);
            topics
        } else {
            Vec::new()
        };

        let recent = self.store.recent_events(user_id, EXCLUSION_WINDOW).await?;
        let consumed: HashSet<&str> = recent.iter().map(|e| e.track_id.as_str()).collect();

        let now_unix = self.clock.now_unix();
        let mut scored: Vec<ScoredItem> = pool
            .into_iter()
            .filter(|item| !consumed.contains(item.id.as_str()))
            .map(|item| {
                let score = score_item(&item, &profile, &expanded_topics, now_unix);
                ScoredItem { item, score }
            })
            .collect();

        // Score-desc; ties broken by recency, then id for a total order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.item.published_at.cmp(&a.item.published_at))
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        scored.truncate(limit);

        Ok(RecommendationResult {
            items: scored,
            strategy: Strategy::HybridCollaborativeAi,
            profile_summary: Some(ProfileSummary {
                top_categories: profile.top_categories(3),
                top_sources: profile.top_sources(3),
                expanded_topics,
                history_count: profile.history_count,
            }),
        })
    }
}

/// Heuristic score for one candidate. Pure; `now_unix` injected.
pub fn score_item(
    item: &NewsItem,
    profile: &UserProfile,
    expanded_topics: &[String],
    now_unix: u64,
) -> f32 {
    let category = item.category.to_lowercase();
    let source = item.source_name.to_lowercase();
    let title = item.title.to_lowercase();
    let summary = item.summary.to_lowercase();

    let mut score = 0.0f32;

    if let Some(w) = profile.category_weights.get(&category) {
        score += W_CATEGORY * w;
    }
    if let Some(w) = profile.source_weights.get(&source) {
        score += W_SOURCE * w;
    }

    let keyword_hits = profile
        .keywords
        .iter()
        .filter(|kw| title.contains(kw.as_str()))
        .count();
    score += (W_KEYWORD_HIT * keyword_hits as f32).min(KEYWORD_SCORE_CAP);

    if profile
        .interests
        .iter()
        .any(|i| i.eq_ignore_ascii_case(&item.category))
    {
        score += W_INTEREST;
    }

    // One topic bonus at most, however many expanded topics match.
    let topic_hit = expanded_topics.iter().any(|topic| {
        topic
            .to_lowercase()
            .split_whitespace()
            .any(|word| title.contains(word) || summary.contains(word))
    });
    if topic_hit {
        score += W_TOPIC;
    }

    if let Some(age) = item.age_secs(now_unix) {
        if age < 6 * 3600 {
            score += W_FRESH_6H;
        } else if age < 24 * 3600 {
            score += W_FRESH_24H;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::SourceType;
    use crate::profile::build_from_events;
    use crate::store::ListeningEvent;

    const NOW: u64 = 1_790_000_000;

    fn item(id: &str, title: &str, category: &str, age_hours: u64) -> NewsItem {
        NewsItem {
            id: id.to_string(),
            title: title.to_string(),
            summary: String::new(),
            source_name: "Wire".into(),
            source_url: format!("https://wire.test/{id}"),
            image_url: None,
            published_at: chrono::DateTime::from_timestamp(
                (NOW - age_hours * 3600) as i64,
                0,
            ),
            category: category.to_string(),
            region: "global".into(),
            tags: Vec::new(),
            source_type: SourceType::Rss,
            aggregator_tag: None,
        }
    }

    fn listened(category: &str, age_days: u64) -> ListeningEvent {
        let played_at = chrono::DateTime::from_timestamp((NOW - age_days * 86_400) as i64, 0)
            .unwrap()
            .to_rfc3339();
        ListeningEvent {
            user_id: "u".into(),
            track_id: format!("{category}-{age_days}"),
            category: category.into(),
            source: "wire".into(),
            title: "Listened title".into(),
            played_at,
            duration_secs: 60,
        }
    }

    #[test]
    fn category_weight_dominates_all_else_equal() {
        let events = vec![
            listened("tech", 1),
            listened("tech", 2),
            listened("politics", 8),
        ];
        let profile = build_from_events(&events, Vec::new(), NOW);

        let matching = score_item(&item("a", "Plain headline", "tech", 48), &profile, &[], NOW);
        let non_matching =
            score_item(&item("b", "Plain headline", "sport", 48), &profile, &[], NOW);
        assert!(matching > non_matching);
    }

    #[test]
    fn keyword_bonus_is_capped() {
        let profile = UserProfile {
            keywords: vec![
                "alpha".into(),
                "beta".into(),
                "gamma".into(),
                "delta".into(),
                "epsilon".into(),
            ],
            history_count: 5,
            ..UserProfile::default()
        };
        let it = item("k", "alpha beta gamma delta epsilon", "misc", 48);
        let score = score_item(&it, &profile, &[], NOW);
        assert!((score - KEYWORD_SCORE_CAP).abs() < 1e-5);
    }

    #[test]
    fn topic_bonus_applies_once() {
        let profile = UserProfile {
            history_count: 5,
            ..UserProfile::default()
        };
        let it = item("t", "fusion milestone in reactor test", "science", 48);
        let one = score_item(&it, &profile, &["fusion power".into()], NOW);
        let two = score_item(
            &it,
            &profile,
            &["fusion power".into(), "reactor design".into()],
            NOW,
        );
        assert!((one - W_TOPIC).abs() < 1e-5);
        assert!((two - one).abs() < 1e-5);
    }

    #[test]
    fn recency_bonus_tiers() {
        let profile = UserProfile {
            history_count: 1,
            ..UserProfile::default()
        };
        let fresh = score_item(&item("f", "x", "misc", 2), &profile, &[], NOW);
        let recent = score_item(&item("r", "x", "misc", 12), &profile, &[], NOW);
        let old = score_item(&item("o", "x", "misc", 72), &profile, &[], NOW);
        assert!((fresh - W_FRESH_6H).abs() < 1e-5);
        assert!((recent - W_FRESH_24H).abs() < 1e-5);
        assert!(old.abs() < 1e-5);
    }
}

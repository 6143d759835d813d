// src/profile.rs
//! # User Profile Builder
//! Converts raw listening history into a decayed, normalized interest
//! profile. Recomputed per request, never cached; history is re-read from the
//! store on every call.
//!
//! Event weight is `1 / (1 + age_days * DECAY_RATE)` with `age_days =
//! max(1, days_since(played_at))`; unparsable timestamps count as week-old.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::Clock;
use crate::error::EngineError;
use crate::ingest::tokenize_keywords;
use crate::store::{ListenStore, ListeningEvent};

/// Most recent events considered per profile build.
pub const HISTORY_WINDOW: usize = 100;
/// Per-day decay factor. Tunable heuristic, not a learned parameter.
pub const DECAY_RATE: f32 = 0.1;
pub const TOP_CATEGORIES: usize = 8;
pub const TOP_SOURCES: usize = 5;
pub const TOP_KEYWORDS: usize = 15;
/// Assumed age for events whose timestamp does not parse.
pub const FALLBACK_AGE_DAYS: f32 = 7.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserProfile {
    /// Top categories by decayed weight. Both weight maps are normalized to
    /// sum 1.0 when `history_count > 0`.
    pub category_weights: HashMap<String, f32>,
    pub source_weights: HashMap<String, f32>,
    pub keywords: Vec<String>,
    pub interests: Vec<String>,
    pub history_count: usize,
}

impl UserProfile {
    /// Names sorted weight-desc, ties alphabetical.
    pub fn top_categories(&self, n: usize) -> Vec<String> {
        top_names(&self.category_weights, n)
    }

    pub fn top_sources(&self, n: usize) -> Vec<String> {
        top_names(&self.source_weights, n)
    }
}

fn top_names(weights: &HashMap<String, f32>, n: usize) -> Vec<String> {
    let mut entries: Vec<_> = weights.iter().collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    entries.into_iter().take(n).map(|(k, _)| k.clone()).collect()
}

pub struct ProfileBuilder {
    store: Arc<dyn ListenStore>,
    clock: Arc<dyn Clock>,
}

impl ProfileBuilder {
    pub fn new(store: Arc<dyn ListenStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn build(&self, user_id: &str) -> Result<UserProfile, EngineError> {
        let events = self.store.recent_events(user_id, HISTORY_WINDOW).await?;
        let interests = self.store.declared_interests(user_id).await?;
        Ok(build_from_events(&events, interests, self.clock.now_unix()))
    }
}

/// Pure profile computation; `now_unix` injected for testability.
pub fn build_from_events(
    events: &[ListeningEvent],
    interests: Vec<String>,
    now_unix: u64,
) -> UserProfile {
    if events.is_empty() {
        return UserProfile {
            interests,
            ..UserProfile::default()
        };
    }

    let mut category_weights: HashMap<String, f32> = HashMap::new();
    let mut source_weights: HashMap<String, f32> = HashMap::new();
    let mut keyword_counts: HashMap<String, usize> = HashMap::new();

    for event in events {
        let weight = decay_weight(event_age_days(&event.played_at, now_unix));
        *category_weights
            .entry(event.category.to_lowercase())
            .or_default() += weight;
        *source_weights
            .entry(event.source.to_lowercase())
            .or_default() += weight;
        for token in tokenize_keywords(&event.title) {
            *keyword_counts.entry(token).or_default() += 1;
        }
    }

    let mut category_weights = keep_top(category_weights, TOP_CATEGORIES);
    normalize(&mut category_weights);
    let mut source_weights = keep_top(source_weights, TOP_SOURCES);
    normalize(&mut source_weights);

    let mut keywords: Vec<_> = keyword_counts.into_iter().collect();
    keywords.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    keywords.truncate(TOP_KEYWORDS);

    UserProfile {
        category_weights,
        source_weights,
        keywords: keywords.into_iter().map(|(k, _)| k).collect(),
        interests,
        history_count: events.len(),
    }
}

pub fn decay_weight(age_days: f32) -> f32 {
    1.0 / (1.0 + age_days * DECAY_RATE)
}

/// Whole days since `played_at`, floored at one; unparsable stamps fall back
/// to [`FALLBACK_AGE_DAYS`].
fn event_age_days(played_at: &str, now_unix: u64) -> f32 {
    let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(played_at.trim()) else {
        return FALLBACK_AGE_DAYS;
    };
    let Ok(ts) = u64::try_from(parsed.timestamp()) else {
        return FALLBACK_AGE_DAYS;
    };
    let days = now_unix.saturating_sub(ts) / 86_400;
    (days as f32).max(1.0)
}

fn keep_top(weights: HashMap<String, f32>, n: usize) -> HashMap<String, f32> {
    let mut entries: Vec<_> = weights.into_iter().collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    entries.truncate(n);
    entries.into_iter().collect()
}

fn normalize(weights: &mut HashMap<String, f32>) {
    let sum: f32 = weights.values().sum();
    if sum > 0.0 {
        for w in weights.values_mut() {
            *w /= sum;
        }
    }
}

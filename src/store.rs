// src/store.rs
//! Persistence collaborator seam. The durable engine is external; this crate
//! consumes a document-style surface (filtered find/sort/paginate, count,
//! upsert-by-key) through `ListenStore`. `MemoryStore` is the in-process
//! implementation used by tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One playback event from the listening history, read-only here.
///
/// `played_at` stays a string on purpose: upstream writers are sloppy and the
/// profile builder treats unparsable stamps as week-old events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListeningEvent {
    pub user_id: String,
    pub track_id: String,
    pub category: String,
    pub source: String,
    pub title: String,
    pub played_at: String,
    pub duration_secs: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ListenStore: Send + Sync {
    /// Most recent events for a user, newest first, at most `limit`.
    async fn recent_events(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ListeningEvent>, StoreError>;

    async fn event_count(&self, user_id: &str) -> Result<usize, StoreError>;

    /// Declared interests from the preference document; empty when unset.
    async fn declared_interests(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    async fn upsert_interests(
        &self,
        user_id: &str,
        interests: Vec<String>,
    ) -> Result<(), StoreError>;
}

/// Capacity-bounded in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    events: Mutex<Vec<ListeningEvent>>,
    interests: Mutex<HashMap<String, Vec<String>>>,
    cap: usize,
}

impl MemoryStore {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            interests: Mutex::new(HashMap::new()),
            cap: cap.min(10_000).max(1),
        }
    }

    /// Append one event, evicting the oldest past capacity. Events are kept
    /// in insertion order; insertion order is assumed chronological.
    pub fn record(&self, event: ListeningEvent) {
        let mut events = self.events.lock().expect("memory store mutex poisoned");
        events.push(event);
        if events.len() > self.cap {
            let excess = events.len() - self.cap;
            events.drain(0..excess);
        }
    }
}

#[async_trait]
impl ListenStore for MemoryStore {
    async fn recent_events(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ListeningEvent>, StoreError> {
        let events = self.events.lock().expect("memory store mutex poisoned");
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn event_count(&self, user_id: &str) -> Result<usize, StoreError> {
        let events = self.events.lock().expect("memory store mutex poisoned");
        Ok(events.iter().filter(|e| e.user_id == user_id).count())
    }

    async fn declared_interests(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let interests = self.interests.lock().expect("memory store mutex poisoned");
        Ok(interests.get(user_id).cloned().unwrap_or_default())
    }

    async fn upsert_interests(
        &self,
        user_id: &str,
        interests: Vec<String>,
    ) -> Result<(), StoreError> {
        let mut map = self.interests.lock().expect("memory store mutex poisoned");
        map.insert(user_id.to_string(), interests);
        Ok(())
    }
}

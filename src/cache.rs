//! # Cache & rate-limit services
//! Explicit service objects owned by the engine and passed by handle.
//! The clock is injected so TTL behavior is testable without sleeping.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time source abstraction. Production uses [`SystemClock`]; tests use
/// [`ManualClock`] to step time deterministically.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Single-slot TTL cache. `stale` flips exactly when `now - stored_at > ttl`.
#[derive(Debug)]
pub struct TtlCache<T: Clone> {
    slot: RwLock<Slot<T>>,
    ttl_secs: u64,
}

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    stored_at: u64,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(Slot {
                value: None,
                stored_at: 0,
            }),
            ttl_secs: ttl.as_secs(),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Value regardless of age; `None` only before the first `put`.
    pub fn peek(&self) -> Option<T> {
        self.slot.read().expect("ttl cache lock poisoned").value.clone()
    }

    /// Value only while within TTL.
    pub fn get_fresh(&self, clock: &dyn Clock) -> Option<T> {
        let slot = self.slot.read().expect("ttl cache lock poisoned");
        match &slot.value {
            Some(v) if clock.now_unix().saturating_sub(slot.stored_at) <= self.ttl_secs => {
                Some(v.clone())
            }
            _ => None,
        }
    }

    pub fn put(&self, value: T, clock: &dyn Clock) {
        let mut slot = self.slot.write().expect("ttl cache lock poisoned");
        slot.value = Some(value);
        slot.stored_at = clock.now_unix();
    }

    /// Unix seconds of the last successful `put`, if any.
    pub fn last_stored_at(&self) -> Option<u64> {
        let slot = self.slot.read().expect("ttl cache lock poisoned");
        slot.value.as_ref().map(|_| slot.stored_at)
    }

    pub fn is_stale(&self, clock: &dyn Clock) -> bool {
        let slot = self.slot.read().expect("ttl cache lock poisoned");
        match slot.value {
            Some(_) => clock.now_unix().saturating_sub(slot.stored_at) > self.ttl_secs,
            None => true,
        }
    }
}

/// Per-key sliding-window rate limiter. Stale timestamps are pruned lazily
/// on each `allow` call; there is no background sweeper.
#[derive(Debug)]
pub struct RateLimiter {
    window_secs: u64,
    max_hits: usize,
    hits: Mutex<HashMap<String, Vec<u64>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_hits: usize) -> Self {
        Self {
            window_secs: window.as_secs(),
            max_hits,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a hit for `key` and report whether it is within budget.
    pub fn allow(&self, key: &str, clock: &dyn Clock) -> bool {
        let now = clock.now_unix();
        let cutoff = now.saturating_sub(self.window_secs);

        let mut map = self.hits.lock().expect("rate limiter lock poisoned");
        map.retain(|_, stamps| {
            stamps.retain(|&t| t > cutoff);
            !stamps.is_empty()
        });

        let stamps = map.entry(key.to_string()).or_default();
        if stamps.len() >= self.max_hits {
            return false;
        }
        stamps.push(now);
        true
    }

    pub fn tracked_keys(&self) -> usize {
        self.hits.lock().expect("rate limiter lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_until_ttl_exceeded_then_stale() {
        let clock = ManualClock::at(1_000);
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(600));
        assert!(cache.is_stale(&clock));

        cache.put(7, &clock);
        clock.advance(600);
        // age == ttl is still fresh; stale means strictly older.
        assert_eq!(cache.get_fresh(&clock), Some(7));
        assert!(!cache.is_stale(&clock));

        clock.advance(1);
        assert_eq!(cache.get_fresh(&clock), None);
        assert!(cache.is_stale(&clock));
        assert_eq!(cache.peek(), Some(7));
    }

    #[test]
    fn rate_limiter_caps_hits_and_prunes() {
        let clock = ManualClock::at(5_000);
        let rl = RateLimiter::new(Duration::from_secs(60), 3);

        assert!(rl.allow("10.0.0.1", &clock));
        assert!(rl.allow("10.0.0.1", &clock));
        assert!(rl.allow("10.0.0.1", &clock));
        assert!(!rl.allow("10.0.0.1", &clock));
        // Other keys are unaffected.
        assert!(rl.allow("10.0.0.2", &clock));

        clock.advance(61);
        assert!(rl.allow("10.0.0.1", &clock));
        // The pruning pass dropped the expired stamps for both keys.
        assert_eq!(rl.tracked_keys(), 1);
    }
}

//! Keyed TTL cache of fully processed story collections. The clock is
//! injected so TTL behavior is testable without real time delays.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use crate::types::GeolocatedStory;

/// Default cache key for the global pipeline.
pub const GLOBAL_KEY: &str = "global";

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

struct CacheEntry {
    data: Vec<GeolocatedStory>,
    stored_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_stories: usize,
    pub oldest_age_secs: u64,
}

/// In-memory result cache. Keys are opaque strings; the cache does exact
/// match only. Entries older than the TTL are evicted on read and never
/// served.
pub struct NewsCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl_millis: u64,
    clock: Arc<dyn Clock>,
}

impl NewsCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_millis: ttl.as_millis() as u64,
            clock,
        }
    }

    /// Return the stored collection if present and fresh. A stale entry is
    /// evicted and treated as absent atomically with the read.
    pub fn get(&self, key: &str) -> Option<Vec<GeolocatedStory>> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().expect("news cache mutex poisoned");

        let age = match entries.get(key) {
            Some(entry) => now.saturating_sub(entry.stored_at),
            None => return None,
        };
        if age > self.ttl_millis {
            entries.remove(key);
            return None;
        }

        debug!(key, age_secs = age / 1000, "cache hit");
        entries.get(key).map(|e| e.data.clone())
    }

    /// Overwrite any existing entry for the key and reset its timestamp.
    pub fn set(&self, key: &str, data: Vec<GeolocatedStory>) {
        debug!(key, count = data.len(), "caching stories");
        self.entries
            .lock()
            .expect("news cache mutex poisoned")
            .insert(
                key.to_string(),
                CacheEntry {
                    data,
                    stored_at: self.clock.now_millis(),
                },
            );
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("news cache mutex poisoned")
            .clear();
        debug!("cache cleared");
    }

    /// Drop expired entries. May be called periodically by an external
    /// scheduler or opportunistically before reads.
    pub fn clear_expired(&self) {
        let now = self.clock.now_millis();
        let mut entries = self.entries.lock().expect("news cache mutex poisoned");
        let before = entries.len();
        entries.retain(|_, e| now.saturating_sub(e.stored_at) <= self.ttl_millis);
        let cleared = before - entries.len();
        if cleared > 0 {
            debug!(cleared, "cleared expired cache entries");
        }
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_millis();
        let entries = self.entries.lock().expect("news cache mutex poisoned");

        let mut total_stories = 0;
        let mut oldest_age = 0u64;
        for e in entries.values() {
            total_stories += e.data.len();
            oldest_age = oldest_age.max(now.saturating_sub(e.stored_at));
        }

        CacheStats {
            entries: entries.len(),
            total_stories,
            oldest_age_secs: oldest_age / 1000,
        }
    }
}

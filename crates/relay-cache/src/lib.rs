// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local TTL cache for read-heavy, write-rarely data.
//!
//! Each entry is stamped with its insertion instant; a lookup after the TTL
//! has elapsed behaves as absent and evicts the entry. Safe under concurrent
//! access from HTTP handlers. Hit/miss counters feed [`CacheStats`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Snapshot of one cache's counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub hit_rate: String,
    pub ttl_secs: u64,
}

/// A named string-keyed cache whose entries expire `ttl` after insertion.
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    entries: Mutex<HashMap<String, (V, Instant)>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached value if present and not expired. Expired entries
    /// are evicted on the way out and count as misses.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        if let Some((value, inserted_at)) = entries.get(key) {
            if inserted_at.elapsed() < self.ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache = self.name, key, "cache hit");
                return Some(value.clone());
            }
            entries.remove(key);
            debug!(cache = self.name, key, "cache expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, key, "cache miss");
        None
    }

    /// Stores a value, stamping it with the current instant.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        debug!(cache = self.name, key = key.as_str(), "cache set");
        entries.insert(key, (value, Instant::now()));
    }

    /// Removes one key.
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        if entries.remove(key).is_some() {
            debug!(cache = self.name, key, "cache invalidated");
        }
    }

    /// Removes every key starting with `prefix`; returns how many were
    /// dropped.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(cache = self.name, prefix, removed, "cache prefix invalidated");
        }
        removed
    }

    /// Drops all entries.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let count = entries.len();
        entries.clear();
        debug!(cache = self.name, count, "cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let size = self.entries.lock().expect("cache lock poisoned").len();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            format!("{:.1}%", hits as f64 / total as f64 * 100.0)
        } else {
            "0.0%".to_string()
        };
        CacheStats {
            name: self.name.to_string(),
            hits,
            misses,
            size,
            hit_rate,
            ttl_secs: self.ttl.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl: Duration) -> TtlCache<String> {
        TtlCache::new("test", ttl)
    }

    #[test]
    fn miss_then_set_then_get_within_ttl_returns_value() {
        let c = cache(Duration::from_secs(60));
        assert!(c.get("k").is_none());
        c.set("k", "v".to_string());
        assert_eq!(c.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn entries_expire_after_ttl() {
        let c = cache(Duration::from_millis(10));
        c.set("k", "v".to_string());
        std::thread::sleep(Duration::from_millis(20));
        assert!(c.get("k").is_none());
        // The expired entry was evicted.
        assert_eq!(c.stats().size, 0);
    }

    #[test]
    fn invalidate_removes_single_key() {
        let c = cache(Duration::from_secs(60));
        c.set("a", "1".to_string());
        c.set("b", "2".to_string());
        c.invalidate("a");
        assert!(c.get("a").is_none());
        assert_eq!(c.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn set_then_prefix_invalidate_then_get_misses() {
        let c = cache(Duration::from_secs(60));
        c.set("models:r1", "x".to_string());
        c.set("models:r2", "y".to_string());
        c.set("other", "z".to_string());
        assert_eq!(c.invalidate_prefix("models:"), 2);
        assert!(c.get("models:r1").is_none());
        assert!(c.get("models:r2").is_none());
        assert_eq!(c.get("other").as_deref(), Some("z"));
    }

    #[test]
    fn clear_drops_everything() {
        let c = cache(Duration::from_secs(60));
        c.set("a", "1".to_string());
        c.set("b", "2".to_string());
        c.clear();
        assert_eq!(c.stats().size, 0);
        assert!(c.get("a").is_none());
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let c = cache(Duration::from_secs(60));
        c.get("missing");
        c.set("k", "v".to_string());
        c.get("k");
        c.get("k");
        let stats = c.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hit_rate, "66.7%");
        assert_eq!(stats.ttl_secs, 60);
    }

    #[test]
    fn concurrent_access_is_safe() {
        let c = std::sync::Arc::new(cache(Duration::from_secs(60)));
        let mut handles = Vec::new();
        for i in 0..8 {
            let c = c.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("k{}", (i + j) % 10);
                    c.set(key.clone(), "v".to_string());
                    c.get(&key);
                    if j % 10 == 0 {
                        c.invalidate_prefix("k1");
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        // No panic and counters moved.
        assert!(c.stats().hits + c.stats().misses > 0);
    }
}

//! TTL + LRU response store.
//!
//! Entries expire lazily: an expired entry is dropped when a lookup finds
//! it, and otherwise lingers until evicted by recency. No background task
//! sweeps the map.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use tokio::time::Instant;

use crate::cache::fingerprint::Fingerprint;
use crate::clock::SharedClock;
use crate::observability::metrics;

/// A cached value and its absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    /// `None` when the TTL reaches past the representable clock range.
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    /// Expired strictly after `expires_at`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub max_entries: usize,
    pub hit_rate: f64,
}

/// Bounded response cache keyed by [`Fingerprint`].
#[derive(Debug)]
pub struct ResponseCache<V = serde_json::Value> {
    entries: Mutex<LruCache<Fingerprint, CacheEntry<V>>>,
    max_entries: NonZeroUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    clock: SharedClock,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(max_entries: usize, clock: SharedClock) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(max_entries)),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<Fingerprint, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a live entry, marking it most recently used.
    pub fn get(&self, key: &Fingerprint) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let lookup = entries
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));
        let found = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                tracing::trace!(key = %key, "Cache entry expired");
                None
            }
            None => None,
        };
        let size = entries.len();
        drop(entries);

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup(true);
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup(false);
                metrics::record_cache_size(size);
                tracing::trace!(key = %key, "Cache miss");
                None
            }
        }
    }

    /// Insert or replace an entry expiring `ttl` from now.
    pub fn set(&self, key: Fingerprint, value: V, ttl: Duration) {
        let expires_at = self.clock.now().checked_add(ttl);
        let mut entries = self.lock();

        let entry = CacheEntry { value, expires_at };
        if let Some((evicted, _)) = entries.push(key.clone(), entry) {
            if evicted != key {
                tracing::debug!(
                    evicted = %evicted,
                    "Cache full, evicted least recently used entry"
                );
            }
        }
        metrics::record_cache_size(entries.len());
    }

    /// Remove every entry whose endpoint contains `pattern`.
    ///
    /// Returns how many live entries were removed. Expired matches are
    /// dropped too but not counted.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();

        let matching: Vec<Fingerprint> = entries
            .iter()
            .filter(|(key, _)| key.endpoint().contains(pattern))
            .map(|(key, _)| key.clone())
            .collect();

        let removed = matching
            .iter()
            .filter_map(|key| entries.pop(key))
            .filter(|entry| !entry.is_expired(now))
            .count();
        metrics::record_cache_size(entries.len());
        drop(entries);

        tracing::info!(pattern, removed, "Invalidated cache entries");
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
        metrics::record_cache_size(0);
    }

    /// Stored entries, expired ones not yet reclaimed included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            entries: self.len(),
            max_entries: self.max_entries.get(),
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn cache(max: usize) -> (ResponseCache<&'static str>, ManualClock) {
        let clock = ManualClock::new();
        (ResponseCache::new(max, Arc::new(clock.clone())), clock)
    }

    fn key(endpoint: &str) -> Fingerprint {
        Fingerprint::new("GET", endpoint)
    }

    #[test]
    fn test_expiry_boundary() {
        let (cache, clock) = cache(10);
        cache.set(key("/paper/1"), "v", Duration::from_secs(1));

        clock.advance(Duration::from_millis(500));
        assert_eq!(cache.get(&key("/paper/1")), Some("v"));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&key("/paper/1")), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.invalidate("/paper/"), 0);
    }

    #[test]
    fn test_lru_eviction_respects_access() {
        let (cache, _) = cache(2);
        let ttl = Duration::from_secs(60);
        cache.set(key("/paper/a"), "a", ttl);
        cache.set(key("/paper/b"), "b", ttl);

        // Touch the oldest entry so "b" becomes least recently used.
        assert_eq!(cache.get(&key("/paper/a")), Some("a"));
        cache.set(key("/paper/c"), "c", ttl);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key("/paper/a")), Some("a"));
        assert_eq!(cache.get(&key("/paper/b")), None);
        assert_eq!(cache.get(&key("/paper/c")), Some("c"));
    }

    #[test]
    fn test_set_replaces_without_growing() {
        let (cache, clock) = cache(2);
        cache.set(key("/paper/a"), "old", Duration::from_secs(1));
        cache.set(key("/paper/a"), "new", Duration::from_secs(10));
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get(&key("/paper/a")), Some("new"));
    }

    #[test]
    fn test_invalidate_pattern() {
        let (cache, _) = cache(10);
        let ttl = Duration::from_secs(60);
        cache.set(key("/paper/1"), "p1", ttl);
        cache.set(key("/paper/2"), "p2", ttl);
        cache.set(key("/author/9"), "a9", ttl);

        assert_eq!(cache.invalidate("/paper/"), 2);
        assert_eq!(cache.get(&key("/author/9")), Some("a9"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.invalidate("/paper/"), 0);
    }

    #[test]
    fn test_unbounded_ttl_never_expires() {
        let (cache, clock) = cache(10);
        cache.set(key("/paper/1"), "v", Duration::from_secs(u64::MAX));

        clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
        assert_eq!(cache.get(&key("/paper/1")), Some("v"));
        assert_eq!(cache.invalidate("/paper/"), 1);
    }

    #[test]
    fn test_stats() {
        let (cache, _) = cache(10);
        cache.set(key("/paper/1"), "p1", Duration::from_secs(60));
        cache.get(&key("/paper/1"));
        cache.get(&key("/paper/1"));
        cache.get(&key("/paper/2"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.max_entries, 10);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-9);

        cache.clear();
        assert!(cache.is_empty());
    }
}

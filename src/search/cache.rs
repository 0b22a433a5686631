//! Search result cache
//!
//! Cache-aside storage for search results, keyed by a fingerprint of the
//! normalized query and the requested page.
//!
//! - An entry older than the TTL is a miss and is removed by the read that
//!   finds it; there is no background sweeper.
//! - When a store finds more than `max_entries` entries, it first sweeps out
//!   every expired entry. Fresh entries are never evicted, so sustained
//!   unique-query traffic can push the map past `max_entries` until entries
//!   age out. A sweep that frees nothing is logged at warn level.
//! - Reads share a read lock; stores and sweeps take the write lock.

use crate::config::CacheConfig;
use crate::search::SearchResult;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Default entry lifetime
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default entry count above which stores sweep expired entries
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Deterministic fingerprint of `(normalized query, offset, limit)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for one page of results for `query`
    ///
    /// The query is trimmed, internal whitespace is collapsed and the text is
    /// lowercased, so `"Call  Routing "` and `"call routing"` share a key.
    pub fn new(query: &str, offset: usize, limit: usize) -> Self {
        let material = format!("{}-{}-{}", normalize_query(query), offset, limit);
        Self(hex::encode(Sha256::digest(material.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims, collapses whitespace runs to one space, and lowercases
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: SearchResult,
    stored_at: DateTime<Utc>,
}

/// Counters for cache effectiveness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Expired entries removed by reads or sweeps
    pub evictions: u64,
    pub entries: usize,
}

/// TTL-bounded search result cache
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl ResultCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `ttl` - Entry lifetime
    /// * `max_entries` - Entry count above which a store sweeps expired entries
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Creates a cache sized by the `[cache]` configuration section
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A stored_at in the future (clock step) counts as fresh
        match (now - entry.stored_at).to_std() {
            Ok(age) => age > self.ttl,
            Err(_) => false,
        }
    }

    /// Returns the cached result for `key` if it is within the TTL
    ///
    /// An expired entry is removed before the miss is reported.
    pub fn lookup(&self, key: &CacheKey) -> Option<SearchResult> {
        let now = Utc::now();

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some(entry) if !self.is_expired(entry, now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.result.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a concurrent store may
        // have refreshed the entry in between
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.result.clone())
            }
            Some(_) => {
                entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache entry {} expired", key);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `result` under `key`, replacing any previous entry
    pub fn store(&self, key: CacheKey, result: SearchResult) {
        self.store_at(key, result, Utc::now());
    }

    fn store_at(&self, key: CacheKey, result: SearchResult, stored_at: DateTime<Utc>) {
        let now = Utc::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if entries.len() > self.max_entries {
            let before = entries.len();
            entries.retain(|_, entry| !self.is_expired(entry, now));
            let removed = before - entries.len();
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);

            if removed == 0 {
                tracing::warn!(
                    "Result cache holds {} fresh entries (threshold {}); nothing to evict",
                    before,
                    self.max_entries
                );
            } else {
                tracing::debug!("Result cache sweep removed {} expired entries", removed);
            }
        }

        entries.insert(key, CacheEntry { result, stored_at });
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Article;
    use std::sync::Arc;

    fn result(total: u64) -> SearchResult {
        SearchResult {
            articles: vec![Article {
                id: total.to_string(),
                title: format!("Article {}", total),
                body: "<p>b</p>".to_string(),
                url: format!("https://support.example.com/hc/en-us/articles/{}-a", total),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
            total,
        }
    }

    fn expired_timestamp(cache: &ResultCache) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::from_std(cache.ttl()).unwrap() - chrono::Duration::seconds(1)
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(
            CacheKey::new("  Call   Routing ", 0, 10),
            CacheKey::new("call routing", 0, 10)
        );
        assert_ne!(CacheKey::new("call routing", 0, 10), CacheKey::new("call routing", 10, 10));
        assert_ne!(CacheKey::new("call routing", 0, 10), CacheKey::new("call routing", 0, 20));
        assert_ne!(CacheKey::new("call routing", 0, 10), CacheKey::new("callrouting", 0, 10));
        assert_eq!(CacheKey::new("x", 0, 10).as_str().len(), 64);
    }

    #[test]
    fn test_round_trip() {
        let cache = ResultCache::default();
        let key = CacheKey::new("routing", 0, 10);
        let stored = result(3);

        assert!(cache.lookup(&key).is_none());
        cache.store(key.clone(), stored.clone());
        assert_eq!(cache.lookup(&key), Some(stored));

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_store_replaces_entry() {
        let cache = ResultCache::default();
        let key = CacheKey::new("routing", 0, 10);

        cache.store(key.clone(), result(1));
        cache.store(key.clone(), result(2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&key).unwrap().total, 2);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let cache = ResultCache::default();
        let key = CacheKey::new("routing", 0, 10);

        cache.store_at(key.clone(), result(1), expired_timestamp(&cache));
        assert_eq!(cache.len(), 1);

        assert!(cache.lookup(&key).is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_entry_just_inside_ttl_is_a_hit() {
        let cache = ResultCache::new(Duration::from_secs(60), 10);
        let key = CacheKey::new("routing", 0, 10);

        cache.store_at(key.clone(), result(1), Utc::now() - chrono::Duration::seconds(30));
        assert!(cache.lookup(&key).is_some());
    }

    #[test]
    fn test_store_sweeps_only_expired_entries() {
        let cache = ResultCache::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES);
        let old = expired_timestamp(&cache);

        for i in 0..5 {
            cache.store_at(CacheKey::new(&format!("old {}", i), 0, 10), result(i), old);
        }
        for i in 0..996 {
            cache.store(CacheKey::new(&format!("fresh {}", i), 0, 10), result(i));
        }
        assert_eq!(cache.len(), 1001);

        cache.store(CacheKey::new("newest", 0, 10), result(0));

        assert_eq!(cache.len(), 997);
        assert_eq!(cache.stats().evictions, 5);
        for i in 0..5 {
            assert!(cache.lookup(&CacheKey::new(&format!("old {}", i), 0, 10)).is_none());
        }
        assert!(cache.lookup(&CacheKey::new("newest", 0, 10)).is_some());
        assert!(cache.lookup(&CacheKey::new("fresh 0", 0, 10)).is_some());
    }

    #[test]
    fn test_fresh_entries_are_never_swept() {
        let cache = ResultCache::new(DEFAULT_TTL, 3);
        for i in 0..6 {
            cache.store(CacheKey::new(&format!("q{}", i), 0, 10), result(i));
        }

        assert_eq!(cache.len(), 6);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_no_sweep_at_threshold() {
        let cache = ResultCache::new(DEFAULT_TTL, 2);
        let old = expired_timestamp(&cache);

        cache.store_at(CacheKey::new("a", 0, 10), result(1), old);
        cache.store_at(CacheKey::new("b", 0, 10), result(2), old);
        // Two entries is not above the threshold of two
        cache.store(CacheKey::new("c", 0, 10), result(3));
        assert_eq!(cache.len(), 3);

        // Three is, so this store sweeps both expired entries first
        cache.store(CacheKey::new("d", 0, 10), result(4));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let cache = Arc::new(ResultCache::new(DEFAULT_TTL, 50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = CacheKey::new(&format!("q{}", i % 20), t, 10);
                        if cache.lookup(&key).is_none() {
                            cache.store(key, result(i));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 800);
        assert_eq!(stats.entries, 160);
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::default();
        cache.store(CacheKey::new("a", 0, 10), result(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}

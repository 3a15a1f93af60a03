//! Keyed store with a fixed time-to-live
//!
//! An entry is valid iff `now - fetched_at < ttl`. Expired entries are never
//! served, but they are also not dropped on read: removal is always explicit
//! through [`ResourceCache::invalidate`] or [`ResourceCache::invalidate_prefix`].

use log::debug;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for cached collections (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of stored entries, valid or not
    pub entries: usize,
    /// Reads answered from a valid entry
    pub hits: u64,
    /// Reads that found nothing or only an expired entry
    pub misses: u64,
}

/// TTL-keyed cache of remote values
#[derive(Debug, Clone)]
pub struct ResourceCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl<V> Default for ResourceCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V> ResourceCache<V> {
    /// Create an empty cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// The time-to-live this cache was built with
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether `key` holds an entry younger than the TTL
    pub fn is_valid(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.ttl)
    }

    /// Get the value for `key` if it is still valid
    ///
    /// Expired entries yield `None` but stay stored until invalidated.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if self.is_valid(key) {
            self.hits += 1;
            debug!("Cache HIT for {}", key);
            self.entries.get(key).map(|entry| &entry.value)
        } else {
            self.misses += 1;
            debug!("Cache MISS for {}", key);
            None
        }
    }

    /// Store `value` under `key`, stamping it with the current instant
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Remove one entry, or every entry when `key` is `None`
    pub fn invalidate(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                if self.entries.remove(key).is_some() {
                    debug!("Cache invalidated {}", key);
                }
            }
            None => {
                debug!("Cache cleared ({} entries)", self.entries.len());
                self.entries.clear();
            }
        }
    }

    /// Remove every entry whose key starts with `prefix`
    ///
    /// Returns the number of removed entries.
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Cache invalidated {} entries with prefix '{}'", removed, prefix);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

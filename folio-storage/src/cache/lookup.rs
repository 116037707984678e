//! A single bounded, named lookup cache.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Result of a cache probe.
///
/// `Hit(None)` means the key was looked up before and confirmed absent in
/// the backing store; callers must not treat it as a cold miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult<V> {
    /// The key is in the cache. The payload is the cached value, or `None`
    /// for a cached-absent entry.
    Hit(Option<V>),
    /// The key has never been cached (or was evicted/invalidated).
    Miss,
}

impl<V> CacheResult<V> {
    /// True for any hit, including cached-absent.
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheResult::Hit(_))
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: Option<V>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    tick: u64,
}

/// A bounded, thread-safe lookup cache with explicit absent-value entries.
///
/// Never the system of record: any entry may vanish at any time (eviction,
/// invalidation) and correctness must not depend on its presence. Mutation
/// is safe under concurrent invalidation and population.
#[derive(Debug)]
pub struct LookupCache<K, V> {
    name: &'static str,
    capacity: usize,
    inner: RwLock<Inner<K, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Eq + Hash + Clone, V: Clone> LookupCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        LookupCache {
            name,
            capacity: capacity.max(1),
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The cache's name, for instrumentation.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Probe the cache. Touches the entry for eviction ordering.
    pub fn get(&self, key: &K) -> CacheResult<V> {
        // A poisoned lock means a panic mid-mutation; treat the cache as
        // cold rather than propagating - it is not the system of record.
        let Ok(mut inner) = self.inner.write() else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return CacheResult::Miss;
        };
        inner.tick += 1;
        let tick = inner.tick;
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = tick;
                self.hits.fetch_add(1, Ordering::Relaxed);
                CacheResult::Hit(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                CacheResult::Miss
            }
        }
    }

    /// Insert a value, or a cached-absent marker when `value` is `None`.
    /// Evicts the least recently used entry when full.
    pub fn put(&self, key: K, value: Option<V>) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        inner.tick += 1;
        let tick = inner.tick;
        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            if let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&oldest);
            }
        }
        inner.entries.insert(
            key,
            Entry {
                value,
                last_used: tick,
            },
        );
    }

    /// Remove one key.
    pub fn remove(&self, key: &K) {
        if let Ok(mut inner) = self.inner.write() {
            inner.entries.remove(key);
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.entries.clear();
        }
    }

    /// Snapshot usage statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.read().map(|i| i.entries.len()).unwrap_or(0);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

impl<V: Clone> LookupCache<String, V> {
    /// Remove every key that matches `key` case-insensitively.
    ///
    /// A single logical entity may be cached under several case variants of
    /// its key in case-insensitive namespaces, so invalidation must sweep
    /// them all. Slower than [`LookupCache::remove`]; only used when the
    /// exact cached variants are unknowable.
    pub fn remove_case_insensitive(&self, key: &str) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        inner
            .entries
            .retain(|cached, _| !cached.eq_ignore_ascii_case(key));
    }
}

//! Bounded in-memory caches: a generic FIFO/LRU [`MemoryCache`] and the
//! [`TransformCache`] built on it.

use crate::core::error::Result;
use crate::dataset::SampleKey;
use crate::histogram::transform::{Transform, TransformKind};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

/// Bounded key/value store evicting the oldest entry (FIFO) or the least
/// recently used one (LRU). A depth of 0 stores nothing.
#[derive(Debug, Clone)]
pub struct MemoryCache<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    max_depth: usize,
    is_lru: bool,
}

impl<K: Eq + Hash + Clone, V> MemoryCache<K, V> {
    /// Create a cache holding at most `max_depth` entries.
    pub fn new(max_depth: usize, is_lru: bool) -> Self {
        MemoryCache {
            entries: HashMap::with_capacity(max_depth),
            order: VecDeque::with_capacity(max_depth),
            max_depth,
            is_lru,
        }
    }

    /// Look up an entry; an LRU hit marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        if self.is_lru {
            self.touch(key);
        }
        self.entries.get(key)
    }

    /// Look up an entry without touching LRU order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Whether the key is present, without touching LRU order.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace an entry, evicting one if the cache is full.
    pub fn insert(&mut self, key: K, value: V) {
        if self.max_depth == 0 {
            return;
        }
        if self.entries.contains_key(&key) {
            self.remove_from_order(&key);
        } else if self.entries.len() >= self.max_depth {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.entries.remove(key)?;
        self.remove_from_order(key);
        Some(value)
    }

    /// Drop every entry whose key fails `keep`.
    pub fn retain<F: FnMut(&K) -> bool>(&mut self, mut keep: F) {
        self.order.retain(|k| keep(k));
        let order = &self.order;
        self.entries.retain(|k, _| order.contains(k));
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn touch(&mut self, key: &K) {
        self.remove_from_order(key);
        self.order.push_back(key.clone());
    }

    fn remove_from_order(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }
}

/// Cache key of a transform: which sample state and which transform.
pub type TransformKey = (SampleKey, TransformKind);

/// Hit/miss counters of a [`TransformCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to build
    pub misses: u64,
}

/// Transforms keyed by `(SampleKey, TransformKind)`.
///
/// Because a sample's key changes on every coordinate mutation and the
/// kind changes with the edges, a lookup can never return a transform built
/// from other coordinates or another binning; stale entries simply age out
/// or are dropped with [`TransformCache::invalidate_sample`].
///
/// Building is left to the caller so that it can happen without holding
/// whatever lock guards the cache: [`TransformCache::lookup`], then build,
/// then [`TransformCache::insert`].
#[derive(Debug)]
pub struct TransformCache {
    cache: MemoryCache<TransformKey, Arc<Transform>>,
    stats: CacheStatistics,
}

impl TransformCache {
    /// Create a cache holding at most `max_depth` transforms.
    pub fn new(max_depth: usize, is_lru: bool) -> Self {
        TransformCache {
            cache: MemoryCache::new(max_depth, is_lru),
            stats: CacheStatistics::default(),
        }
    }

    /// Cached transform under `key`, counted as a hit or a miss.
    pub fn lookup(&mut self, key: &TransformKey) -> Option<Arc<Transform>> {
        match self.cache.get(key) {
            Some(transform) => {
                self.stats.hits += 1;
                log::debug!("transform cache hit for {:?}", key.1);
                Some(Arc::clone(transform))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Cached transform under `key`, without touching the counters.
    pub fn peek(&self, key: &TransformKey) -> Option<Arc<Transform>> {
        self.cache.peek(key).cloned()
    }

    /// Store a transform under the key recorded in it, dropping transforms
    /// of older generations of the same sample.
    pub fn insert(&mut self, transform: Arc<Transform>) {
        self.evict_stale(transform.sample_key());
        log::debug!(
            "caching transform {}x{} ({} non-zero) for {}",
            transform.rows(),
            transform.cols(),
            transform.nnz(),
            transform.binning()
        );
        self.cache.insert(transform.key(), transform);
    }

    /// [`TransformCache::lookup`], or `build` and insert on a miss. Callers
    /// sharing the cache behind a lock should look up and insert themselves
    /// instead, building unlocked.
    pub fn get_or_build<F>(&mut self, key: TransformKey, build: F) -> Result<Arc<Transform>>
    where
        F: FnOnce() -> Result<Transform>,
    {
        if let Some(transform) = self.lookup(&key) {
            return Ok(transform);
        }
        let transform = Arc::new(build()?);
        self.insert(Arc::clone(&transform));
        Ok(transform)
    }

    /// Drop every transform built from any state of sample `id`.
    pub fn invalidate_sample(&mut self, id: u64) {
        self.cache.retain(|(sample_key, _)| sample_key.id != id);
    }

    /// Drop transforms built from other generations of the sample `key`
    /// refers to.
    pub fn evict_stale(&mut self, key: SampleKey) {
        self.cache
            .retain(|(sample_key, _)| sample_key.id != key.id || *sample_key == key);
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of cached transforms.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Hit/miss counters.
    pub fn statistics(&self) -> CacheStatistics {
        self.stats
    }
}

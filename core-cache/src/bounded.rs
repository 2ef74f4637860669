//! Bounded in-memory cache with LRU eviction.
//!
//! A thin layer over `lru::LruCache` that adds the two behaviors the
//! catalog layer relies on: a fallible constructor that rejects a
//! non-positive bound, and first-class negative entries — a cached
//! "nothing upstream" answer that is distinct from "never looked up".

use crate::error::{CacheError, Result};
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Default entry bound, matching the general-purpose entity caches.
pub const DEFAULT_MAX_SIZE: usize = 1024;

/// Outcome of a cache probe.
///
/// `Negative` means a `None` value was deliberately stored for the key;
/// `Miss` means the key was never stored (or has been evicted).
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Hit(T),
    Negative,
    Miss,
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    /// The hit value, discarding the negative/miss distinction.
    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// An ordered key→value store with a fixed maximum entry count.
///
/// Reads that hit refresh the entry's recency; inserting beyond the
/// bound evicts exactly the least-recently-used entry.
pub struct BoundedCache<K: Hash + Eq, V> {
    entries: LruCache<K, Option<V>>,
}

impl<K: Hash + Eq, V> BoundedCache<K, V> {
    /// Create a cache holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_size).ok_or_else(|| {
            CacheError::InvalidConfiguration(format!("cache size must be positive, got {max_size}"))
        })?;
        Ok(Self {
            entries: LruCache::new(capacity),
        })
    }

    /// Look up a key, marking it most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Lookup<&V> {
        match self.entries.get(key) {
            Some(Some(value)) => Lookup::Hit(value),
            Some(None) => Lookup::Negative,
            None => Lookup::Miss,
        }
    }

    /// Look up a key without touching its recency.
    pub fn peek(&self, key: &K) -> Lookup<&V> {
        match self.entries.peek(key) {
            Some(Some(value)) => Lookup::Hit(value),
            Some(None) => Lookup::Negative,
            None => Lookup::Miss,
        }
    }

    /// Insert or replace an entry. `None` stores a negative entry.
    ///
    /// When the cache is full the least-recently-used entry is evicted;
    /// replacing an existing key never evicts.
    pub fn put(&mut self, key: K, value: Option<V>) {
        self.entries.put(key, value);
    }

    /// Whether the key has an entry (positive or negative). Does not
    /// refresh recency.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Evict a specific key, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<Option<V>> {
        self.entries.pop(key)
    }

    /// Evict a set of specific keys.
    pub fn prune<'a>(&mut self, keys: impl IntoIterator<Item = &'a K>)
    where
        K: 'a,
    {
        for key in keys {
            self.entries.pop(key);
        }
    }

    /// Iterate entries from most- to least-recently used.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Option<V>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.entries.cap().get()
    }
}

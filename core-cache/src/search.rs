//! Search memoization.
//!
//! Search results are keyed by a normalized signature of the query so
//! that semantically equivalent queries collide: fields that do not
//! affect the remote result set are dropped, the remaining fields are
//! sorted by name, and the whole thing is folded into a Sha256 digest
//! together with the exact flag. Entries are purely in-memory.

use crate::bounded::{BoundedCache, Lookup};
use crate::error::Result;
use crate::key::SCHEME;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

/// Query parameters that cannot be forwarded upstream and would only
/// cause spurious cache misses. `track_no` cannot be queried against
/// the remote catalog for a specific album position.
const VOLATILE_QUERY_FIELDS: &[&str] = &["track_no"];

/// A search query: field name to one or more values. Value order within
/// a field is meaningful; field order is not.
pub type SearchQuery = HashMap<String, Vec<String>>;

/// Hash-stable, order-independent signature of a search query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchKey {
    signature: String,
}

impl SearchKey {
    pub fn new(query: &SearchQuery, exact: bool) -> Self {
        let mut fields: Vec<(&str, &[String])> = query
            .iter()
            .filter(|(field, _)| !VOLATILE_QUERY_FIELDS.contains(&field.as_str()))
            .map(|(field, values)| (field.as_str(), values.as_slice()))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Sha256::new();
        hasher.update([exact as u8]);
        for (field, values) in fields {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
            for value in values {
                hasher.update(value.as_bytes());
                hasher.update([0x1f]);
            }
            hasher.update([0x1e]);
        }

        Self {
            signature: format!("{}:search:{:x}", SCHEME, hasher.finalize()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.signature
    }
}

impl std::fmt::Display for SearchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.signature)
    }
}

/// Memoizing wrapper over the search operation.
///
/// Caching is explicit at the call site: [`SearchCache::fetch`] checks,
/// computes on a miss, stores and returns. Never persisted to disk.
pub struct SearchCache<R> {
    entries: BoundedCache<SearchKey, R>,
}

impl<R: Clone> SearchCache<R> {
    pub fn new(max_size: usize) -> Result<Self> {
        Ok(Self {
            entries: BoundedCache::new(max_size)?,
        })
    }

    /// Return the memoized result for the query, invoking `fetch_fn`
    /// only on a miss.
    pub fn fetch<E>(
        &mut self,
        query: &SearchQuery,
        exact: bool,
        fetch_fn: impl FnOnce() -> std::result::Result<R, E>,
    ) -> std::result::Result<R, E> {
        let key = SearchKey::new(query, exact);
        if let Lookup::Hit(result) = self.entries.get(&key) {
            debug!("search cache hit for {key}");
            return Ok(result.clone());
        }

        debug!("search cache miss for {key}");
        let result = fetch_fn()?;
        self.entries.put(key, Some(result.clone()));
        Ok(result)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

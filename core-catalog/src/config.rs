//! Configuration for the catalog caches.

use core_cache::DEFAULT_MAX_SIZE;
use serde::Deserialize;
use std::path::PathBuf;

/// Entry bound for the caches keyed by individually addressed entities
/// (tracks, images), which see far more distinct keys than the
/// per-collection caches.
const LARGE_CACHE_SIZE: usize = 16 * DEFAULT_MAX_SIZE;

/// Entry bounds and durable-tier location for the entity caches.
///
/// Track and image caches are sized for the long tail of individually
/// addressed entities; the per-collection caches stay small.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the on-disk cache tree. `None` disables the disk tier.
    pub cache_dir: Option<PathBuf>,
    pub track_cache_size: usize,
    pub album_cache_size: usize,
    pub artist_cache_size: usize,
    pub playlist_cache_size: usize,
    pub image_cache_size: usize,
    pub search_cache_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            track_cache_size: LARGE_CACHE_SIZE,
            album_cache_size: DEFAULT_MAX_SIZE,
            artist_cache_size: DEFAULT_MAX_SIZE,
            playlist_cache_size: DEFAULT_MAX_SIZE,
            image_cache_size: LARGE_CACHE_SIZE,
            search_cache_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl CacheConfig {
    /// In-memory configuration rooted at the given cache directory.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: Some(cache_dir.into()),
            ..Self::default()
        }
    }
}

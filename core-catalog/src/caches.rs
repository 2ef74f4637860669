//! Typed entity caches.
//!
//! One bounded store per entity kind, sharing a disk root. Album and
//! artist entries cache the collection's track list under the
//! collection uri; the image store gets its own subtree so album
//! artwork blobs never collide with album track blobs.

use crate::config::CacheConfig;
use crate::models::{Image, Playlist, PlaylistDescriptor, Track};
use core_cache::{EntityKey, EntityKind, Lookup, PersistentStore, Result};
use tracing::{info, warn};

/// The per-kind cache instances owned by a library worker.
pub struct EntityCaches {
    pub tracks: PersistentStore<Track>,
    pub albums: PersistentStore<Vec<Track>>,
    pub artists: PersistentStore<Vec<Track>>,
    pub playlists: PlaylistCache,
    pub images: PersistentStore<Vec<Image>>,
}

impl EntityCaches {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let root = config.cache_dir.clone();
        Ok(Self {
            tracks: PersistentStore::new(config.track_cache_size, root.clone())?,
            albums: PersistentStore::new(config.album_cache_size, root.clone())?,
            artists: PersistentStore::new(config.artist_cache_size, root.clone())?,
            playlists: PlaylistCache::new(config.playlist_cache_size, root.clone())?,
            images: PersistentStore::new(
                config.image_cache_size,
                root.map(|dir| dir.join("image")),
            )?,
        })
    }
}

/// Playlist cache with upstream-staleness detection.
///
/// A cached playlist is only served while the upstream descriptor's
/// last-updated stamp is not newer than the cached `last_modified`;
/// a newer upstream copy forces a miss, which is how edits propagate
/// without an invalidation push channel.
pub struct PlaylistCache {
    store: PersistentStore<Playlist>,
}

impl PlaylistCache {
    pub fn new(max_size: usize, root: Option<std::path::PathBuf>) -> Result<Self> {
        Ok(Self {
            store: PersistentStore::new(max_size, root)?,
        })
    }

    pub fn key_for(playlist_id: &str) -> EntityKey {
        EntityKey::for_entity(EntityKind::Playlist, playlist_id)
    }

    /// Plain lookup by key, no staleness check.
    pub fn get(&mut self, key: &EntityKey) -> Lookup<&Playlist> {
        self.store.get(key)
    }

    /// Lookup against an upstream descriptor. A descriptor that proves
    /// the cached copy out of date turns the hit into a forced miss.
    pub fn get_fresh(&mut self, descriptor: &PlaylistDescriptor) -> Lookup<&Playlist> {
        let key = Self::key_for(&descriptor.id);
        match self.store.get(&key) {
            Lookup::Hit(playlist) => {
                let Some(upstream) = descriptor.last_updated else {
                    warn!(
                        "upstream playlist \"{}\" carries no last-updated stamp: refresh forced",
                        descriptor.name
                    );
                    return Lookup::Miss;
                };
                if upstream > playlist.last_modified {
                    info!(
                        "the playlist \"{}\" has been updated: refresh forced",
                        descriptor.name
                    );
                    return Lookup::Miss;
                }
                Lookup::Hit(playlist)
            }
            other => other,
        }
    }

    pub fn put(&mut self, key: EntityKey, playlist: Playlist) {
        self.store.put(key, Some(playlist));
    }

    /// Batched commit, see [`PersistentStore::extend`].
    pub fn extend(&mut self, updates: impl IntoIterator<Item = (EntityKey, Playlist)>) {
        self.store
            .extend(updates.into_iter().map(|(key, playlist)| (key, Some(playlist))));
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.store.contains(key)
    }

    pub fn remove(&mut self, key: &EntityKey) {
        self.store.remove(key);
    }

    pub fn prune<'a>(&mut self, keys: impl IntoIterator<Item = &'a EntityKey>) {
        self.store.prune(keys);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &Playlist)> {
        self.store.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.store.keys()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

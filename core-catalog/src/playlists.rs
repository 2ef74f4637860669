//! Playlist listing and wholesale refresh.
//!
//! The playlist set is kept in sync by diffing the cached playlist ids
//! against the remote favorites + owned sets: removed ids are pruned,
//! new ids trigger a refresh, and a refresh only re-derives playlists
//! whose cached copy is no longer valid. Favorites are listed before
//! owned playlists so that, on a duplicate id, the favorite's tagged
//! name wins.

use crate::caches::PlaylistCache;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::models::{Playlist, PlaylistDescriptor, PlaylistRef, Track};
use crate::session::CatalogSession;
use chrono::Utc;
use core_cache::EntityKey;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

pub struct PlaylistsService {
    session: Arc<dyn CatalogSession>,
    playlists: PlaylistCache,
}

impl PlaylistsService {
    pub fn new(session: Arc<dyn CatalogSession>, config: &CacheConfig) -> Result<Self> {
        Ok(Self {
            session,
            playlists: PlaylistCache::new(config.playlist_cache_size, config.cache_dir.clone())?,
        })
    }

    /// Name-sorted playlist references, refreshing first only when new
    /// playlist ids appeared upstream since the last refresh.
    pub fn as_list(&mut self) -> Result<Vec<PlaylistRef>> {
        let (added, _removed) = self.added_and_removed()?;
        if !added.is_empty() {
            self.refresh()?;
        }

        debug!("listing playlists");
        let mut refs: Vec<PlaylistRef> = self
            .playlists
            .iter()
            .map(|(key, playlist)| PlaylistRef {
                uri: key.clone(),
                name: playlist.name.clone(),
            })
            .collect();
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(refs)
    }

    /// Rebuild the cached playlist set from the remote service.
    ///
    /// Playlists whose cached copy is still valid against the upstream
    /// stamp are skipped wholesale; for the rest the full track list is
    /// fetched and the entry replaced. All replacements are committed
    /// in one pass.
    pub fn refresh(&mut self) -> Result<()> {
        debug!("refreshing playlists");
        let mut updates = Vec::new();

        for descriptor in self.remote_descriptors()? {
            if self.playlists.get_fresh(&descriptor).is_hit() {
                continue;
            }

            let tracks = self.session.get_playlist_tracks(&descriptor.id)?;
            let key = PlaylistCache::key_for(&descriptor.id);
            updates.push((
                key.clone(),
                Playlist {
                    uri: key,
                    name: descriptor.name,
                    tracks,
                    last_modified: descriptor.last_updated.unwrap_or_else(Utc::now),
                },
            ));
        }

        let refreshed = updates.len();
        self.playlists.extend(updates);
        info!("playlists refreshed, {refreshed} entries updated");
        Ok(())
    }

    /// Single-playlist lookup with a staleness check against the
    /// upstream descriptor. Remote errors propagate: there is no
    /// partial result to preserve here.
    pub fn lookup(&mut self, uri: &str) -> Result<Option<Playlist>> {
        let key = EntityKey::parse(uri)?;
        self.get_or_refresh(&key)
    }

    /// The playlist's track list, empty when the playlist is unknown.
    pub fn tracks(&mut self, uri: &str) -> Result<Vec<Track>> {
        Ok(self
            .lookup(uri)?
            .map(|playlist| playlist.tracks)
            .unwrap_or_default())
    }

    fn get_or_refresh(&mut self, key: &EntityKey) -> Result<Option<Playlist>> {
        if self.playlists.is_empty() {
            self.refresh()?;
        }
        if !self.playlists.contains(key) {
            return Ok(None);
        }

        let stale = match self.session.get_playlist(key.id())? {
            Some(descriptor) => !self.playlists.get_fresh(&descriptor).is_hit(),
            // Gone upstream; a refresh will reconcile.
            None => true,
        };
        if stale {
            self.refresh()?;
        }

        Ok(self.playlists.get(key).hit().cloned())
    }

    /// Favorites first, then owned, deduplicated by id with the
    /// favorite entry winning.
    fn remote_descriptors(&self) -> Result<Vec<PlaylistDescriptor>> {
        let mut descriptors = self.session.favorite_playlists()?;
        let mut seen: HashSet<String> = descriptors.iter().map(|d| d.id.clone()).collect();

        for descriptor in self.session.owned_playlists()? {
            if seen.insert(descriptor.id.clone()) {
                descriptors.push(descriptor);
            }
        }
        Ok(descriptors)
    }

    /// Diff the cached ids against the remote set, pruning entries that
    /// disappeared upstream.
    fn added_and_removed(&mut self) -> Result<(HashSet<String>, HashSet<String>)> {
        let updated: HashSet<String> = self
            .remote_descriptors()?
            .into_iter()
            .map(|d| d.id)
            .collect();

        if self.playlists.is_empty() {
            return Ok((updated, HashSet::new()));
        }

        let current: HashSet<String> = self
            .playlists
            .keys()
            .map(|key| key.id().to_string())
            .collect();
        let added = updated.difference(&current).cloned().collect();
        let removed: HashSet<String> = current.difference(&updated).cloned().collect();

        let doomed: Vec<EntityKey> = self
            .playlists
            .keys()
            .filter(|key| removed.contains(key.id()))
            .cloned()
            .collect();
        self.playlists.prune(doomed.iter());

        Ok((added, removed))
    }
}

//! Batch lookup orchestration.
//!
//! `LibraryService` resolves mixed-type uris to track lists. Each uri
//! consults its entity cache first and falls back to the remote session
//! on a miss; refreshed entries are committed back to the caches in one
//! pass per entity type after the batch, which bounds filesystem writes
//! to once per type per batch. A remote failure for one uri is logged
//! and skipped; the batch itself never fails.

use crate::caches::{EntityCaches, PlaylistCache};
use crate::config::CacheConfig;
use crate::error::{CatalogError, Result};
use crate::models::{Image, Playlist, SearchQuery, SearchResults, Track};
use crate::session::CatalogSession;
use core_cache::{EntityKey, EntityKind, Lookup, SearchCache};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Cache updates accumulated during a batch, applied once per type
/// after the last uri is processed.
#[derive(Default)]
struct PendingUpdates {
    albums: Vec<(EntityKey, Vec<Track>)>,
    artists: Vec<(EntityKey, Vec<Track>)>,
    playlists: Vec<(EntityKey, Playlist)>,
}

/// Resolves catalog uris against the entity caches and the remote
/// session. Single logical owner; callers serialize access.
pub struct LibraryService {
    session: Arc<dyn CatalogSession>,
    caches: EntityCaches,
    search_cache: SearchCache<SearchResults>,
}

impl LibraryService {
    pub fn new(session: Arc<dyn CatalogSession>, config: &CacheConfig) -> Result<Self> {
        Ok(Self {
            session,
            caches: EntityCaches::new(config)?,
            search_cache: SearchCache::new(config.search_cache_size)?,
        })
    }

    /// Resolve a batch of uris to a flat track list.
    ///
    /// Unparseable uris and unsupported entity kinds are skipped; a
    /// remote failure for one uri contributes zero tracks and the rest
    /// of the batch is still processed. Within one uri the remote
    /// service's track ordering is preserved.
    pub fn lookup(&mut self, uris: &[String]) -> Vec<Track> {
        debug!("looking up {} uris", uris.len());
        let mut tracks: Vec<Track> = Vec::new();
        let mut pending = PendingUpdates::default();

        for uri in uris {
            let key = match EntityKey::parse(uri) {
                Ok(key) => key,
                Err(err) => {
                    debug!("skipping uri {uri}: {err}");
                    continue;
                }
            };

            match self.resolve(&key, &mut pending) {
                Ok(resolved) => tracks.extend(resolved),
                Err(err) => error!("error while processing uri {uri}: {err}"),
            }
        }

        self.apply_updates(pending, &tracks);
        info!("returning {} tracks", tracks.len());
        tracks
    }

    /// Best-effort image resolution, one entry per uri that resolved.
    ///
    /// Track uris resolve to their album's artwork. A cached empty list
    /// is a remembered "no artwork upstream" answer, so absent images
    /// are not re-queried on every call.
    pub fn get_images(&mut self, uris: &[String]) -> HashMap<String, Vec<Image>> {
        debug!("resolving images for {} uris", uris.len());
        let mut images = HashMap::new();
        let mut updates = Vec::new();

        for uri in uris {
            match self.resolve_images(uri, &mut updates) {
                Ok(resolved) => {
                    images.insert(uri.clone(), resolved);
                }
                Err(err) => error!("error while processing uri {uri}: {err}"),
            }
        }

        self.caches.images.extend(updates);
        images
    }

    /// Memoized search. Remote errors propagate: this is a single-item
    /// operation with no partial result to preserve.
    pub fn search(&mut self, query: &SearchQuery, exact: bool) -> Result<SearchResults> {
        let session = Arc::clone(&self.session);
        self.search_cache
            .fetch(query, exact, || session.search(query, exact))
            .map_err(CatalogError::from)
    }

    fn resolve(&mut self, key: &EntityKey, pending: &mut PendingUpdates) -> Result<Vec<Track>> {
        match key.kind() {
            EntityKind::Track => self.resolve_track(key, pending),
            EntityKind::Album => self.resolve_album(key, pending),
            EntityKind::Artist => self.resolve_artist(key, pending),
            EntityKind::Playlist => self.resolve_playlist(key, pending),
            // Image keys carry no tracks; they resolve via get_images.
            EntityKind::Image => Ok(Vec::new()),
        }
    }

    fn resolve_track(&mut self, key: &EntityKey, pending: &mut PendingUpdates) -> Result<Vec<Track>> {
        let canonical = key.canonical();
        if let Lookup::Hit(track) = self.caches.tracks.get(&canonical) {
            debug!("found cached track {canonical}");
            return Ok(vec![track.clone()]);
        }

        match key.qualifier() {
            // Album-qualified form: resolve through the album's track list.
            Some(track_id) => {
                let album_key = EntityKey::for_entity(EntityKind::Album, key.id());
                let tracks = match self.caches.albums.get(&album_key) {
                    Lookup::Hit(tracks) if !tracks.is_empty() => tracks.clone(),
                    _ => {
                        let fetched = self.session.get_album_tracks(key.id())?;
                        pending.albums.push((album_key, fetched.clone()));
                        fetched
                    }
                };

                let track = tracks.into_iter().find(|t| t.uri.id() == track_id);
                if track.is_none() {
                    warn!("track {key} not found in album {}", key.id());
                }
                Ok(track.into_iter().collect())
            }
            // Direct form: single-entity fetch.
            None => match self.session.get_track(key.id())? {
                Some(track) => Ok(vec![track]),
                None => {
                    debug!("{key} is not available on the backend");
                    Ok(Vec::new())
                }
            },
        }
    }

    fn resolve_album(&mut self, key: &EntityKey, pending: &mut PendingUpdates) -> Result<Vec<Track>> {
        // An empty cached list is treated as a miss: it carries nothing
        // worth serving and the remote copy may have tracks by now.
        if let Lookup::Hit(tracks) = self.caches.albums.get(key) {
            if !tracks.is_empty() {
                debug!("found cached album {key}");
                return Ok(tracks.clone());
            }
        }

        let tracks = self.session.get_album_tracks(key.id())?;
        pending.albums.push((key.clone(), tracks.clone()));
        Ok(tracks)
    }

    fn resolve_artist(&mut self, key: &EntityKey, pending: &mut PendingUpdates) -> Result<Vec<Track>> {
        if let Lookup::Hit(tracks) = self.caches.artists.get(key) {
            if !tracks.is_empty() {
                debug!("found cached artist {key}");
                return Ok(tracks.clone());
            }
        }

        let tracks = self.session.get_artist_top_tracks(key.id())?;
        pending.artists.push((key.clone(), tracks.clone()));
        Ok(tracks)
    }

    fn resolve_playlist(&mut self, key: &EntityKey, pending: &mut PendingUpdates) -> Result<Vec<Track>> {
        if let Lookup::Hit(playlist) = self.caches.playlists.get(key) {
            debug!("found cached playlist {key}");
            return Ok(playlist.tracks.clone());
        }

        // The object that must be cached (playlist with metadata)
        // differs from the list that must be returned (its tracks).
        match self.session.get_playlist_with_tracks(key.id())? {
            Some(playlist) => {
                let tracks = playlist.tracks.clone();
                pending
                    .playlists
                    .push((PlaylistCache::key_for(key.id()), playlist));
                Ok(tracks)
            }
            None => {
                debug!("{key} is not available on the backend");
                Ok(Vec::new())
            }
        }
    }

    fn resolve_images(
        &mut self,
        uri: &str,
        updates: &mut Vec<(EntityKey, Option<Vec<Image>>)>,
    ) -> Result<Vec<Image>> {
        let key = EntityKey::parse(uri)?;

        // Tracks use the artwork of the associated album; the album id
        // comes from the album-qualified key form.
        let target = match key.kind() {
            EntityKind::Track => {
                if key.qualifier().is_none() {
                    return Err(core_cache::CacheError::InvalidKey(format!(
                        "track uri {uri} carries no album segment"
                    ))
                    .into());
                }
                EntityKey::for_entity(EntityKind::Album, key.id())
            }
            kind => EntityKey::for_entity(kind, key.id()),
        };

        if let Lookup::Hit(images) = self.caches.images.get(&target) {
            return Ok(images.clone());
        }

        debug!("retrieving {target} from the API");
        let images: Vec<Image> = self
            .session
            .get_image(target.kind(), target.id())?
            .into_iter()
            .collect();
        if images.is_empty() {
            debug!("{target} has no associated images");
        }
        updates.push((target, Some(images.clone())));
        Ok(images)
    }

    fn apply_updates(&mut self, pending: PendingUpdates, tracks: &[Track]) {
        self.caches
            .albums
            .extend(pending.albums.into_iter().map(|(k, v)| (k, Some(v))));
        self.caches
            .artists
            .extend(pending.artists.into_iter().map(|(k, v)| (k, Some(v))));
        self.caches.playlists.extend(pending.playlists);

        // Every resolved track becomes directly addressable by its own
        // canonical uri, however it was reached.
        self.caches
            .tracks
            .extend(tracks.iter().map(|t| (t.uri.clone(), Some(t.clone()))));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PlaylistDescriptor;
    use crate::session::{SessionError, SessionResult};
    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Session {}

        impl CatalogSession for Session {
            fn get_track(&self, track_id: &str) -> SessionResult<Option<Track>>;
            fn get_album(&self, album_id: &str) -> SessionResult<Option<crate::models::Album>>;
            fn get_artist(&self, artist_id: &str) -> SessionResult<Option<crate::models::Artist>>;
            fn get_playlist(&self, playlist_id: &str) -> SessionResult<Option<PlaylistDescriptor>>;
            fn get_album_tracks(&self, album_id: &str) -> SessionResult<Vec<Track>>;
            fn get_artist_top_tracks(&self, artist_id: &str) -> SessionResult<Vec<Track>>;
            fn get_playlist_tracks(&self, playlist_id: &str) -> SessionResult<Vec<Track>>;
            fn favorite_playlists(&self) -> SessionResult<Vec<PlaylistDescriptor>>;
            fn owned_playlists(&self) -> SessionResult<Vec<PlaylistDescriptor>>;
            fn get_image(&self, kind: EntityKind, id: &str) -> SessionResult<Option<Image>>;
            fn search(&self, query: &SearchQuery, exact: bool) -> SessionResult<SearchResults>;
        }
    }

    fn track(id: &str) -> Track {
        Track {
            uri: EntityKey::for_entity(EntityKind::Track, id),
            name: format!("Track {id}"),
            artist: None,
            album: None,
            track_no: None,
            duration_secs: None,
        }
    }

    fn transport_error() -> SessionError {
        SessionError::Transport("connection reset".to_string())
    }

    fn service(mock: MockSession) -> LibraryService {
        LibraryService::new(Arc::new(mock), &CacheConfig::default()).unwrap()
    }

    fn uris(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_batch_partial_failure() {
        let mut mock = MockSession::new();
        mock.expect_get_album_tracks()
            .with(eq("a1"))
            .returning(|_| Ok(vec![track("t1")]));
        mock.expect_get_album_tracks()
            .with(eq("a2"))
            .returning(|_| Err(transport_error()));
        mock.expect_get_album_tracks()
            .with(eq("a3"))
            .returning(|_| Ok(vec![track("t3")]));

        let mut service = service(mock);
        let tracks = service.lookup(&uris(&["tidal:album:a1", "tidal:album:a2", "tidal:album:a3"]));

        let names: Vec<&str> = tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Track t1", "Track t3"]);
    }

    #[test]
    fn test_album_lookup_is_cached_across_batches() {
        let mut mock = MockSession::new();
        mock.expect_get_album_tracks()
            .with(eq("a1"))
            .times(1)
            .returning(|_| Ok(vec![track("t1"), track("t2")]));

        let mut service = service(mock);
        let first = service.lookup(&uris(&["tidal:album:a1"]));
        let second = service.lookup(&uris(&["tidal:album:a1"]));

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolved_tracks_become_directly_addressable() {
        let mut mock = MockSession::new();
        mock.expect_get_album_tracks()
            .with(eq("a1"))
            .times(1)
            .returning(|_| Ok(vec![track("t1")]));
        // No get_track expectation: a remote fetch for the track uri
        // would panic the mock.

        let mut service = service(mock);
        service.lookup(&uris(&["tidal:album:a1"]));

        let tracks = service.lookup(&uris(&["tidal:track:t1"]));
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].uri.as_str(), "tidal:track:t1");
    }

    #[test]
    fn test_album_qualified_track_resolves_through_album() {
        let mut mock = MockSession::new();
        mock.expect_get_album_tracks()
            .with(eq("a1"))
            .times(1)
            .returning(|_| Ok(vec![track("t1"), track("t2")]));

        let mut service = service(mock);
        let tracks = service.lookup(&uris(&["tidal:track:a1:t2"]));

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].uri.as_str(), "tidal:track:t2");

        // The album fetched on the way is now cached too.
        let album = service.lookup(&uris(&["tidal:album:a1"]));
        assert_eq!(album.len(), 2);
    }

    #[test]
    fn test_direct_track_form_falls_back_to_single_fetch() {
        let mut mock = MockSession::new();
        mock.expect_get_track()
            .with(eq("t9"))
            .times(1)
            .returning(|_| Ok(Some(track("t9"))));

        let mut service = service(mock);
        let tracks = service.lookup(&uris(&["tidal:track:t9"]));
        assert_eq!(tracks.len(), 1);

        // Second batch is served from the track cache.
        let again = service.lookup(&uris(&["tidal:track:t9"]));
        assert_eq!(again, tracks);
    }

    #[test]
    fn test_unsupported_uris_are_skipped() {
        let mut mock = MockSession::new();
        mock.expect_get_album_tracks()
            .with(eq("a1"))
            .returning(|_| Ok(vec![track("t1")]));

        let mut service = service(mock);
        let tracks = service.lookup(&uris(&[
            "tidal:mood:chill",
            "not a uri",
            "tidal:album:a1",
        ]));

        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_playlist_lookup_caches_object_and_returns_tracks() {
        let mut mock = MockSession::new();
        mock.expect_get_playlist()
            .with(eq("p1"))
            .times(1)
            .returning(|_| {
                Ok(Some(PlaylistDescriptor {
                    id: "p1".to_string(),
                    name: "Morning".to_string(),
                    last_updated: Some(Utc.timestamp_opt(100, 0).unwrap()),
                }))
            });
        mock.expect_get_playlist_tracks()
            .with(eq("p1"))
            .times(1)
            .returning(|_| Ok(vec![track("t1"), track("t2")]));

        let mut service = service(mock);
        let first = service.lookup(&uris(&["tidal:playlist:p1"]));
        assert_eq!(first.len(), 2);

        // Served wholesale from the playlist cache the second time.
        let second = service.lookup(&uris(&["tidal:playlist:p1"]));
        assert_eq!(second, first);
    }

    #[test]
    fn test_get_images_redirects_tracks_to_album_artwork() {
        let mut mock = MockSession::new();
        mock.expect_get_image()
            .with(eq(EntityKind::Album), eq("a1"))
            .times(1)
            .returning(|_, _| {
                Ok(Some(Image {
                    url: "https://img.example/a1.jpg".to_string(),
                    width: 320,
                    height: 320,
                }))
            });

        let mut service = service(mock);
        let images = service.get_images(&uris(&["tidal:track:a1:t1"]));
        assert_eq!(images["tidal:track:a1:t1"].len(), 1);

        // The album uri itself now hits the same cache entry.
        let album_images = service.get_images(&uris(&["tidal:album:a1"]));
        assert_eq!(album_images["tidal:album:a1"].len(), 1);
    }

    #[test]
    fn test_get_images_remembers_absence() {
        let mut mock = MockSession::new();
        mock.expect_get_image()
            .with(eq(EntityKind::Artist), eq("ar1"))
            .times(1)
            .returning(|_, _| Ok(None));

        let mut service = service(mock);
        let first = service.get_images(&uris(&["tidal:artist:ar1"]));
        assert!(first["tidal:artist:ar1"].is_empty());

        let second = service.get_images(&uris(&["tidal:artist:ar1"]));
        assert!(second["tidal:artist:ar1"].is_empty());
    }

    #[test]
    fn test_get_images_omits_failed_uris() {
        let mut mock = MockSession::new();
        mock.expect_get_image()
            .with(eq(EntityKind::Album), eq("a1"))
            .returning(|_, _| Err(transport_error()));

        let mut service = service(mock);
        let images = service.get_images(&uris(&["tidal:album:a1", "tidal:track:nope"]));
        assert!(images.is_empty());
    }

    #[test]
    fn test_search_is_memoized() {
        let mut query = SearchQuery::new();
        query.insert("artist".to_string(), vec!["X".to_string()]);

        let mut mock = MockSession::new();
        mock.expect_search().times(1).returning(|_, _| {
            Ok(SearchResults {
                tracks: vec![track("t1")],
                ..SearchResults::default()
            })
        });

        let mut service = service(mock);
        let first = service.search(&query, true).unwrap();
        let second = service.search(&query, true).unwrap();

        assert_eq!(first.tracks.len(), 1);
        assert_eq!(second, first);
    }

    #[test]
    fn test_search_propagates_remote_errors() {
        let mut query = SearchQuery::new();
        query.insert("artist".to_string(), vec!["X".to_string()]);

        let mut mock = MockSession::new();
        mock.expect_search()
            .returning(|_, _| Err(transport_error()));

        let mut service = service(mock);
        assert!(matches!(
            service.search(&query, false),
            Err(CatalogError::Session(_))
        ));
    }

    #[test]
    fn test_playlist_entries_survive_a_restart() {
        let root = tempfile::TempDir::new().unwrap();
        let config = CacheConfig::with_cache_dir(root.path());

        let mut mock = MockSession::new();
        mock.expect_get_playlist().with(eq("p1")).returning(|_| {
            Ok(Some(PlaylistDescriptor {
                id: "p1".to_string(),
                name: "Morning".to_string(),
                last_updated: Some(Utc.timestamp_opt(100, 0).unwrap()),
            }))
        });
        mock.expect_get_playlist_tracks()
            .with(eq("p1"))
            .times(1)
            .returning(|_| Ok(vec![track("t1")]));

        let mut service = LibraryService::new(Arc::new(mock), &config).unwrap();
        assert_eq!(service.lookup(&uris(&["tidal:playlist:p1"])).len(), 1);
        drop(service);

        // A fresh service over the same root serves the playlist from
        // disk without a remote fetch.
        let fresh_mock = MockSession::new();
        let mut fresh = LibraryService::new(Arc::new(fresh_mock), &config).unwrap();
        assert_eq!(fresh.lookup(&uris(&["tidal:playlist:p1"])).len(), 1);
    }
}

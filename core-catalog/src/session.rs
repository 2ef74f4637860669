//! The remote catalog session boundary.
//!
//! Authentication, transport and rate limiting live behind this trait;
//! the caching layer consumes it as an opaque collaborator. Entities
//! that simply do not exist upstream are `Ok(None)` / empty, not
//! errors — `SessionError` means the call itself failed.

use crate::models::{
    Album, Artist, Image, Playlist, PlaylistDescriptor, SearchQuery, SearchResults, Track,
};
use core_cache::EntityKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Synchronous entity getters exposed by the remote catalog service.
pub trait CatalogSession {
    fn get_track(&self, track_id: &str) -> SessionResult<Option<Track>>;

    fn get_album(&self, album_id: &str) -> SessionResult<Option<Album>>;

    fn get_artist(&self, artist_id: &str) -> SessionResult<Option<Artist>>;

    /// Upstream playlist handle, carrying the last-updated stamp.
    fn get_playlist(&self, playlist_id: &str) -> SessionResult<Option<PlaylistDescriptor>>;

    /// Full playlist object with tracks, for single-playlist fetches.
    fn get_playlist_with_tracks(&self, playlist_id: &str) -> SessionResult<Option<Playlist>> {
        let Some(descriptor) = self.get_playlist(playlist_id)? else {
            return Ok(None);
        };
        let tracks = self.get_playlist_tracks(playlist_id)?;
        Ok(Some(Playlist {
            uri: core_cache::EntityKey::for_entity(EntityKind::Playlist, playlist_id),
            name: descriptor.name,
            tracks,
            last_modified: descriptor.last_updated.unwrap_or_else(chrono::Utc::now),
        }))
    }

    fn get_album_tracks(&self, album_id: &str) -> SessionResult<Vec<Track>>;

    fn get_artist_top_tracks(&self, artist_id: &str) -> SessionResult<Vec<Track>>;

    fn get_playlist_tracks(&self, playlist_id: &str) -> SessionResult<Vec<Track>>;

    /// Playlists the user has marked as favorites.
    fn favorite_playlists(&self) -> SessionResult<Vec<PlaylistDescriptor>>;

    /// Playlists the user owns.
    fn owned_playlists(&self) -> SessionResult<Vec<PlaylistDescriptor>>;

    /// Artwork for an entity, if any.
    fn get_image(&self, kind: EntityKind, id: &str) -> SessionResult<Option<Image>>;

    fn search(&self, query: &SearchQuery, exact: bool) -> SessionResult<SearchResults>;
}

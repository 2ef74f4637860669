//! Domain models for the catalog core.
//!
//! Entity records as produced by the (external) remote-entity mapping
//! adapter, plus the upstream playlist descriptor and search shapes.

use chrono::{DateTime, Utc};
use core_cache::EntityKey;
use serde::{Deserialize, Serialize};

pub use core_cache::SearchQuery;

// =============================================================================
// Catalog entities
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub uri: EntityKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub uri: EntityKey,
    pub name: String,
    pub artist: Option<Artist>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Canonical track uri (`tidal:track:<id>`).
    pub uri: EntityKey,
    pub name: String,
    pub artist: Option<Artist>,
    pub album: Option<Album>,
    pub track_no: Option<u32>,
    pub duration_secs: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub uri: EntityKey,
    pub name: String,
    pub tracks: Vec<Track>,
    /// Modification stamp the staleness check compares against the
    /// upstream descriptor.
    pub last_modified: DateTime<Utc>,
}

/// Image metadata; the binary payload lives with the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

// =============================================================================
// Remote-side shapes
// =============================================================================

/// Lightweight upstream playlist handle, as returned by the remote
/// listing endpoints. Carries the last-updated stamp that drives
/// staleness invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistDescriptor {
    pub id: String,
    pub name: String,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Name + uri reference used for playlist listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub uri: EntityKey,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub tracks: Vec<Track>,
}

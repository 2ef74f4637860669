//! Structured entity keys.
//!
//! Every cache entry is addressed by a `scheme:type:id` string. The
//! second segment is the entity kind discriminator used for dispatch;
//! tracks additionally support an album-qualified four-segment form
//! `scheme:track:<album-id>:<track-id>` used when a track is resolved
//! through its album context.

use crate::error::{CacheError, Result};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// URI scheme for all catalog entities.
pub const SCHEME: &str = "tidal";

/// Entity kind discriminator, parsed from the second key segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Track,
    Album,
    Artist,
    Playlist,
    Image,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Track => "track",
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
            EntityKind::Playlist => "playlist",
            EntityKind::Image => "image",
        }
    }
}

impl FromStr for EntityKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "track" => Ok(EntityKind::Track),
            "album" => Ok(EntityKind::Album),
            "artist" => Ok(EntityKind::Artist),
            "playlist" => Ok(EntityKind::Playlist),
            "image" => Ok(EntityKind::Image),
            other => Err(CacheError::UnsupportedKeyType(other.to_string())),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed entity key.
///
/// Keeps the raw string (identity, display, blob file names) together
/// with the parsed segments. For the four-segment track form, `id` is
/// the album id and `qualifier` the track id, matching the key grammar.
#[derive(Debug, Clone)]
pub struct EntityKey {
    raw: String,
    kind: EntityKind,
    id: String,
    qualifier: Option<String>,
}

impl EntityKey {
    /// Parse a raw `scheme:type:id[:qualifier]` string.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 3 || parts.iter().take(3).any(|p| p.is_empty()) {
            return Err(CacheError::InvalidKey(raw.to_string()));
        }

        let kind = parts[1].parse::<EntityKind>()?;
        let qualifier = match kind {
            EntityKind::Track if parts.len() >= 4 && !parts[3].is_empty() => {
                Some(parts[3].to_string())
            }
            _ => None,
        };

        Ok(Self {
            raw: raw.to_string(),
            kind,
            id: parts[2].to_string(),
            qualifier,
        })
    }

    /// Build the canonical three-segment key for an entity.
    pub fn for_entity(kind: EntityKind, id: &str) -> Self {
        Self {
            raw: format!("{}:{}:{}", SCHEME, kind.as_str(), id),
            kind,
            id: id.to_string(),
            qualifier: None,
        }
    }

    /// Build the album-qualified four-segment track key.
    pub fn album_track(album_id: &str, track_id: &str) -> Self {
        Self {
            raw: format!("{}:track:{}:{}", SCHEME, album_id, track_id),
            kind: EntityKind::Track,
            id: album_id.to_string(),
            qualifier: Some(track_id.to_string()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Second id segment. For album-qualified track keys this is the
    /// album id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Trailing id segment of an album-qualified track key.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Short id prefix used to bucket blob files on disk.
    pub fn id_prefix(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(2)
            .map(|(i, _)| i)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }

    /// The canonical key the entity is addressable by on its own:
    /// album-qualified track keys collapse to `scheme:track:<track-id>`,
    /// everything else is already canonical.
    pub fn canonical(&self) -> EntityKey {
        match (&self.kind, &self.qualifier) {
            (EntityKind::Track, Some(track_id)) => EntityKey::for_entity(EntityKind::Track, track_id),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for EntityKey {}

impl std::hash::Hash for EntityKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl FromStr for EntityKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// Keys serialize as their raw string so persisted blobs stay readable
// and self-describing.
impl Serialize for EntityKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for EntityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        EntityKey::parse(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_segment_key() {
        let key = EntityKey::parse("tidal:album:123").unwrap();
        assert_eq!(key.kind(), EntityKind::Album);
        assert_eq!(key.id(), "123");
        assert_eq!(key.qualifier(), None);
        assert_eq!(key.as_str(), "tidal:album:123");
    }

    #[test]
    fn test_parse_album_qualified_track_key() {
        let key = EntityKey::parse("tidal:track:123:456").unwrap();
        assert_eq!(key.kind(), EntityKind::Track);
        assert_eq!(key.id(), "123");
        assert_eq!(key.qualifier(), Some("456"));
        assert_eq!(key.canonical().as_str(), "tidal:track:456");
    }

    #[test]
    fn test_parse_direct_track_key_is_canonical() {
        let key = EntityKey::parse("tidal:track:456").unwrap();
        assert_eq!(key.qualifier(), None);
        assert_eq!(key.canonical(), key);
    }

    #[test]
    fn test_parse_rejects_short_keys() {
        assert!(matches!(
            EntityKey::parse("tidal:album"),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            EntityKey::parse("tidal::123"),
            Err(CacheError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(matches!(
            EntityKey::parse("tidal:mood:123"),
            Err(CacheError::UnsupportedKeyType(_))
        ));
    }

    #[test]
    fn test_id_prefix_bucketing() {
        let key = EntityKey::for_entity(EntityKind::Album, "abcdef");
        assert_eq!(key.id_prefix(), "ab");

        let short = EntityKey::for_entity(EntityKind::Album, "a");
        assert_eq!(short.id_prefix(), "a");
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let key = EntityKey::album_track("123", "456");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#""tidal:track:123:456""#);

        let back: EntityKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert_eq!(back.qualifier(), Some("456"));
    }
}

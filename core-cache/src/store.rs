//! Filesystem-backed overlay for a bounded cache.
//!
//! The memory tier answers first; on a miss the store tries the blob
//! file derived from the key, promotes a good blob back into memory and
//! deletes a corrupt one. Storage failures never reach the caller: a
//! broken disk degrades the store to a plain in-memory cache and the
//! lookup to a remote fetch.
//!
//! Writes are deferred. `put` only touches the memory tier; the lookup
//! layer commits a whole batch at once through [`PersistentStore::extend`],
//! which bounds file writes to one pass per entity type per batch.

use crate::bounded::{BoundedCache, Lookup};
use crate::error::Result;
use crate::key::EntityKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BLOB_EXTENSION: &str = "blob";

/// A bounded cache with an optional durable tier.
///
/// `root: None` disables the disk tier entirely (the store behaves like
/// a plain [`BoundedCache`]).
pub struct PersistentStore<V> {
    memory: BoundedCache<EntityKey, V>,
    root: Option<PathBuf>,
}

impl<V> PersistentStore<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(max_size: usize, root: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            memory: BoundedCache::new(max_size)?,
            root,
        })
    }

    /// Look up a key in the memory tier, falling back to the blob file.
    ///
    /// A blob that fails to deserialize is deleted and reported as a
    /// miss so the caller re-fetches from the remote service.
    pub fn get(&mut self, key: &EntityKey) -> Lookup<&V> {
        if self.memory.contains(key) {
            return self.memory.get(key);
        }

        if let Some(value) = self.load_blob(key) {
            debug!("filesystem cache hit for {key}");
            self.memory.put(key.clone(), Some(value));
            return self.memory.get(key);
        }

        Lookup::Miss
    }

    /// Insert into the memory tier only. Persistence happens at the
    /// next batched [`extend`](Self::extend).
    pub fn put(&mut self, key: EntityKey, value: Option<V>) {
        self.memory.put(key, value);
    }

    /// Batched commit: insert every update into memory and write the
    /// positive values to disk in the same pass. Negative entries are
    /// never persisted.
    pub fn extend(&mut self, updates: impl IntoIterator<Item = (EntityKey, Option<V>)>) {
        for (key, value) in updates {
            if let Some(value) = &value {
                self.persist(&key, value);
            }
            self.memory.put(key, value);
        }
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.memory.contains(key)
    }

    /// Evict a key from both tiers.
    pub fn remove(&mut self, key: &EntityKey) -> Option<Option<V>> {
        self.delete_blob(key);
        self.memory.remove(key)
    }

    /// Evict a set of keys from both tiers, used when upstream deletion
    /// is detected.
    pub fn prune<'a>(&mut self, keys: impl IntoIterator<Item = &'a EntityKey>) {
        for key in keys {
            self.delete_blob(key);
            self.memory.remove(key);
        }
    }

    /// Iterate the memory tier's positive entries, most-recent first.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &V)> {
        self.memory
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.memory.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    fn blob_path(root: &Path, key: &EntityKey) -> PathBuf {
        root.join(key.kind().as_str())
            .join(key.id_prefix())
            .join(format!("{}.{}", key, BLOB_EXTENSION))
    }

    fn load_blob(&self, key: &EntityKey) -> Option<V> {
        let root = self.root.as_deref()?;
        let path = Self::blob_path(root, key);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("failed to read cache file {}: {err}", path.display());
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                // Corrupt entry on the filesystem: reset it and let the
                // caller refresh from the remote service.
                warn!(
                    "could not deserialize cache file {}: refreshing the entry: {err}",
                    path.display()
                );
                if let Err(err) = fs::remove_file(&path) {
                    warn!("failed to remove corrupt cache file {}: {err}", path.display());
                }
                None
            }
        }
    }

    fn persist(&self, key: &EntityKey, value: &V) {
        let Some(root) = self.root.as_deref() else {
            return;
        };
        let path = Self::blob_path(root, key);

        if let Some(dir) = path.parent() {
            if let Err(err) = fs::create_dir_all(dir) {
                warn!("failed to create cache directory {}: {err}", dir.display());
                return;
            }
        }

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to serialize cache entry {key}: {err}");
                return;
            }
        };

        if let Err(err) = fs::write(&path, bytes) {
            warn!("failed to write cache file {}: {err}", path.display());
        }
    }

    fn delete_blob(&self, key: &EntityKey) {
        let Some(root) = self.root.as_deref() else {
            return;
        };
        let path = Self::blob_path(root, key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!("failed to remove cache file {}: {err}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::EntityKind;
    use tempfile::TempDir;

    fn album_key(id: &str) -> EntityKey {
        EntityKey::for_entity(EntityKind::Album, id)
    }

    fn store(root: &TempDir) -> PersistentStore<Vec<String>> {
        PersistentStore::new(8, Some(root.path().to_path_buf())).unwrap()
    }

    #[test]
    fn test_round_trip_across_instances() {
        let root = TempDir::new().unwrap();
        let key = album_key("123");
        let value = vec!["one".to_string(), "two".to_string()];

        let mut first = store(&root);
        first.extend([(key.clone(), Some(value.clone()))]);
        drop(first);

        let mut second = store(&root);
        assert_eq!(second.get(&key), Lookup::Hit(&value));
    }

    #[test]
    fn test_blob_path_layout() {
        let root = TempDir::new().unwrap();
        let mut store = store(&root);
        store.extend([(album_key("123"), Some(vec!["t".to_string()]))]);

        let expected = root
            .path()
            .join("album")
            .join("12")
            .join("tidal:album:123.blob");
        assert!(expected.is_file());
    }

    #[test]
    fn test_put_does_not_write_through() {
        let root = TempDir::new().unwrap();
        let key = album_key("123");

        let mut first = store(&root);
        first.put(key.clone(), Some(vec!["t".to_string()]));
        drop(first);

        let mut second = store(&root);
        assert!(second.get(&key).is_miss());
    }

    #[test]
    fn test_corrupt_blob_is_deleted_and_reported_as_miss() {
        let root = TempDir::new().unwrap();
        let key = album_key("123");

        let path = root
            .path()
            .join("album")
            .join("12")
            .join("tidal:album:123.blob");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json at all").unwrap();

        let mut store = store(&root);
        assert!(store.get(&key).is_miss());
        assert!(!path.exists());
    }

    #[test]
    fn test_disk_hit_promotes_into_memory() {
        let root = TempDir::new().unwrap();
        let key = album_key("123");
        let value = vec!["t".to_string()];

        let mut writer = store(&root);
        writer.extend([(key.clone(), Some(value.clone()))]);
        drop(writer);

        let mut reader = store(&root);
        assert!(reader.get(&key).is_hit());

        // Remove the blob; the promoted entry still answers.
        let path = root
            .path()
            .join("album")
            .join("12")
            .join("tidal:album:123.blob");
        fs::remove_file(&path).unwrap();
        assert_eq!(reader.get(&key), Lookup::Hit(&value));
    }

    #[test]
    fn test_prune_removes_blob() {
        let root = TempDir::new().unwrap();
        let key = album_key("123");

        let mut store = store(&root);
        store.extend([(key.clone(), Some(vec!["t".to_string()]))]);
        store.prune([&key]);
        assert!(store.is_empty());

        // A fresh instance must not resurrect the pruned entry.
        let mut fresh = PersistentStore::<Vec<String>>::new(
            8,
            Some(root.path().to_path_buf()),
        )
        .unwrap();
        assert!(fresh.get(&key).is_miss());
    }

    #[test]
    fn test_memory_only_mode() {
        let mut store: PersistentStore<Vec<String>> = PersistentStore::new(8, None).unwrap();
        let key = album_key("123");

        store.extend([(key.clone(), Some(vec!["t".to_string()]))]);
        assert!(store.get(&key).is_hit());

        let mut fresh: PersistentStore<Vec<String>> = PersistentStore::new(8, None).unwrap();
        assert!(fresh.get(&key).is_miss());
    }

    #[test]
    fn test_negative_entries_stay_memory_only() {
        let root = TempDir::new().unwrap();
        let key = album_key("123");

        let mut store = store(&root);
        store.extend([(key.clone(), None)]);
        assert_eq!(store.get(&key), Lookup::Negative);

        let mut fresh = PersistentStore::<Vec<String>>::new(
            8,
            Some(root.path().to_path_buf()),
        )
        .unwrap();
        assert!(fresh.get(&key).is_miss());
    }
}

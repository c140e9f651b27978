//! Key-value persistence seam.
//!
//! The backend has get/set/remove/clear semantics and no transactions. Components treat
//! whatever it returns as untrusted: each owns one key and validates what it reads back.

use crate::error::StorageError;
use crate::shared::STORAGE_KEYS;
use dashmap::DashMap;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Raw byte store consumed by the engine components.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Removes every key the core owns.
    fn clear_all(&self) -> Result<(), StorageError> {
        for key in STORAGE_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Shared handle passed to each component at construction.
pub type StoreHandle = Arc<dyn KeyValueStore>;

/// Sled-backed store with an in-memory hot cache checked before the database.
pub struct SledStore {
    db: Db,
    cache: DashMap<String, Vec<u8>>,
}

impl SledStore {
    /// Opens or creates the store at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            cache: DashMap::new(),
        })
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(v) = self.cache.get(key) {
            return Ok(Some(v.clone()));
        }
        let out = self.db.get(key.as_bytes())?.map(|iv| iv.to_vec());
        if let Some(ref bytes) = out {
            self.cache.insert(key.to_string(), bytes.clone());
        }
        Ok(out)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let prev = self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        self.cache.insert(key.to_string(), value.to_vec());
        tracing::info!(
            target: "forest::store",
            key = key,
            bytes = value.len(),
            action = if prev.is_some() { "UPDATE" } else { "INSERT" },
            "store {} key '{}' ({} bytes)",
            if prev.is_some() { "updated" } else { "inserted" },
            key,
            value.len()
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.cache.remove(key);
        if self.db.remove(key.as_bytes())?.is_some() {
            tracing::info!(target: "forest::store", key = key, action = "REMOVE", "store removed key '{}'", key);
        }
        Ok(())
    }
}

/// In-memory store. Used by tests and anywhere durability is not wanted.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle() -> StoreHandle {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Reads a JSON array stored under `key`, keeping the elements that decode and pass `keep`.
///
/// Absent key, backend error, or a value that is not a JSON array all read as empty.
/// Never use the result as the base of a rewrite; see [`try_read_json_array`].
pub(crate) fn read_json_array<T, F>(store: &dyn KeyValueStore, key: &str, keep: F) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&T) -> bool,
{
    try_read_json_array(store, key, keep).unwrap_or_else(|e| {
        tracing::warn!(target: "forest::store", key = key, error = %e, "read failed; treating as empty");
        Vec::new()
    })
}

/// Like [`read_json_array`], but a backend error is returned instead of reading as empty.
///
/// Read-modify-write callers use this so a transient read failure cannot truncate the key.
pub(crate) fn try_read_json_array<T, F>(
    store: &dyn KeyValueStore,
    key: &str,
    keep: F,
) -> Result<Vec<T>, StorageError>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let bytes = match store.get(key)? {
        Some(b) => b,
        None => return Ok(Vec::new()),
    };
    let items: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(target: "forest::store", key = key, error = %e, "corrupt array; treating as empty");
            return Ok(Vec::new());
        }
    };
    let total = items.len();
    let out: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<T>(item).ok())
        .filter(|item| keep(item))
        .collect();
    if out.len() < total {
        tracing::warn!(
            target: "forest::store",
            key = key,
            discarded = total - out.len(),
            "discarded malformed elements"
        );
    }
    Ok(out)
}

/// Serializes `items` as a JSON array under `key`.
pub(crate) fn write_json_array<T: serde::Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec(items)?;
    store.set(key, &bytes)
}


#[cfg(test)]
mod tests {
    use super::testing::FlakyStore;
    use super::*;

    #[test]
    fn sled_store_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStore::open_path(dir.path()).unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", b"v1").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v1".to_vec()));
        store.set("k", b"v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"v2".to_vec()));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn sled_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = SledStore::open_path(dir.path()).unwrap();
            store.set(crate::shared::PROFILE_KEY, b"{}").unwrap();
        }
        let store = SledStore::open_path(dir.path()).unwrap();
        assert_eq!(store.get(crate::shared::PROFILE_KEY).unwrap(), Some(b"{}".to_vec()));
    }

    #[test]
    fn clear_all_removes_owned_keys_only() {
        let store = MemoryStore::new();
        for key in STORAGE_KEYS {
            store.set(key, b"x").unwrap();
        }
        store.set("unrelated", b"y").unwrap();
        store.clear_all().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("unrelated").unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn read_json_array_skips_bad_elements() {
        let store = MemoryStore::new();
        store.set("nums", br#"[1, "two", 3, null, 5]"#).unwrap();
        let got: Vec<u32> = read_json_array(&store, "nums", |_| true);
        assert_eq!(got, vec![1, 3, 5]);
    }

    #[test]
    fn read_json_array_corrupt_is_empty() {
        let store = MemoryStore::new();
        store.set("nums", b"not json at all").unwrap();
        let got: Vec<u32> = read_json_array(&store, "nums", |_| true);
        assert!(got.is_empty());
    }

    #[test]
    fn try_read_surfaces_backend_errors() {
        let store = FlakyStore::default();
        store.inner.set("nums", b"[1, 2]").unwrap();
        store.fail_next_gets(1);
        let err = try_read_json_array::<u32, _>(&store, "nums", |_| true);
        assert!(matches!(err, Err(StorageError::Backend(_))));
        let got: Vec<u32> = try_read_json_array(&store, "nums", |_| true).unwrap();
        assert_eq!(got, vec![1, 2]);

        store.fail_next_gets(1);
        let lenient: Vec<u32> = read_json_array(&store, "nums", |_| true);
        assert!(lenient.is_empty());
    }
}

//! Key-value persistence for the four Konekta collections.
//!
//! Every collection is stored as one JSON value under a fixed key and is
//! always read and written whole. There is no locking between the read and
//! the write of a read-modify-write cycle: two writers racing on the same
//! key lose one of the updates without noticing. Callers are expected to
//! run a single writer at a time.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Raw byte store addressed by string keys.
pub trait RecordStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Reads a whole collection. Missing keys and undecodable payloads both
/// come back as an empty collection.
pub fn read_collection<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> anyhow::Result<Vec<T>> {
    let Some(bytes) = store.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_slice(&bytes) {
        Ok(records) => Ok(records),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored collection is unreadable, treating as empty");
            Ok(Vec::new())
        }
    }
}

pub fn write_collection<T: Serialize>(
    store: &dyn RecordStore,
    key: &str,
    records: &[T],
) -> anyhow::Result<()> {
    store.set(key, &serde_json::to_vec(records)?)
}

/// Reads a bare string value such as the current user id.
pub fn read_scalar(store: &dyn RecordStore, key: &str) -> anyhow::Result<Option<String>> {
    Ok(store
        .get(key)?
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|v| !v.is_empty()))
}

pub fn write_scalar(store: &dyn RecordStore, key: &str, value: &str) -> anyhow::Result<()> {
    store.set(key, value.as_bytes())
}

/// Volatile store, used by tests and by the native server when no data
/// directory is configured.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory. Survives restarts of the native
/// server the way browser storage survives page reloads.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            anyhow::bail!("invalid store key: {:?}", key);
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl RecordStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        std::fs::write(self.path_for(key)?, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The Spin component's default key-value store.
pub struct SpinStore {
    inner: spin_sdk::key_value::Store,
}

impl SpinStore {
    pub fn open_default() -> anyhow::Result<Self> {
        let inner = spin_sdk::key_value::Store::open_default()
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {:?}", e))?;
        Ok(Self { inner })
    }
}

impl RecordStore for SpinStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.inner
            .get(key)
            .map_err(|e| anyhow::anyhow!("KV get {} failed: {:?}", key, e))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.inner
            .set(key, value)
            .map_err(|e| anyhow::anyhow!("KV set {} failed: {:?}", key, e))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.inner
            .delete(key)
            .map_err(|e| anyhow::anyhow!("KV delete {} failed: {:?}", key, e))
    }
}

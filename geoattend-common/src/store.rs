//! Client-side key-value store used to hand data between screens
//!
//! Two access patterns are layered on a plain string store:
//! - [`PersistentKey`]: a value kept across visits (the last registration id)
//! - [`TransferSlot`]: a one-shot record written by one screen and removed by
//!   the single reader that takes it

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Key under which the last registration identifier is kept
pub const REGISTRATION_ID_KEY: &str = "registration_id";

/// Key of the one-shot submission result record
pub const SUBMISSION_RESULT_KEY: &str = "submission_result";

/// Minimal string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key, returning the value it held
    ///
    /// When two callers race, at most one of them receives the value.
    fn remove(&self, key: &str) -> Result<Option<String>>;
}

/// In-memory store (tests, single-process sessions)
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Internal("Memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.remove(key))
    }
}

/// One file per key inside a directory
///
/// Writes go through a temp file and rename; removal renames the file away
/// first so a concurrent reader cannot take the same record twice.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (creating if missing) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!("Key-value store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(Error::InvalidInput(format!("Invalid store key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        static TAKE_SEQ: AtomicU64 = AtomicU64::new(0);
        let claimed = path.with_extension(format!(
            "json.taken.{}.{}",
            std::process::id(),
            TAKE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        match std::fs::rename(&path, &claimed) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let content = std::fs::read_to_string(&claimed);
        std::fs::remove_file(&claimed)?;
        Ok(Some(content?))
    }
}

/// Stored record wrapper carrying its write time
#[derive(Debug, Serialize, Deserialize)]
struct Stamped<T> {
    stored_at: DateTime<Utc>,
    value: T,
}

/// Typed value kept across visits under a well-known key
#[derive(Debug, Clone, Copy)]
pub struct PersistentKey<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> PersistentKey<T> {
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn load(&self, store: &dyn KeyValueStore) -> Result<Option<T>> {
        match store.get(self.key)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(key = self.key, "Discarding unreadable stored value: {}", e);
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore, value: &T) -> Result<()> {
        store.set(self.key, &serde_json::to_string(value)?)
    }

    pub fn clear(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.remove(self.key)?;
        Ok(())
    }
}

/// Typed read-once hand-off between two screens
///
/// `take` deletes the record as part of reading it. Records older than the
/// slot's TTL are deleted and reported as absent.
#[derive(Debug, Clone, Copy)]
pub struct TransferSlot<T> {
    key: &'static str,
    ttl: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> TransferSlot<T> {
    pub const fn new(key: &'static str, ttl: Duration) -> Self {
        Self {
            key,
            ttl,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Write the record, replacing any unread one
    pub fn put(&self, store: &dyn KeyValueStore, value: &T) -> Result<()> {
        let stamped = Stamped {
            stored_at: crate::time::now(),
            value,
        };
        store.set(self.key, &serde_json::to_string(&stamped)?)
    }

    /// Remove and return the record if present and fresh
    pub fn take(&self, store: &dyn KeyValueStore) -> Result<Option<T>> {
        let Some(raw) = store.remove(self.key)? else {
            return Ok(None);
        };

        let stamped: Stamped<T> = match serde_json::from_str(&raw) {
            Ok(stamped) => stamped,
            Err(e) => {
                warn!(key = self.key, "Discarding unreadable transfer record: {}", e);
                return Ok(None);
            }
        };

        if crate::time::is_expired(stamped.stored_at, self.ttl, crate::time::now()) {
            debug!(key = self.key, stored_at = %stamped.stored_at, "Discarding stale transfer record");
            return Ok(None);
        }

        Ok(Some(stamped.value))
    }
}

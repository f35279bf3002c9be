//! Credential cache shared by the token-based authenticators.
//!
//! Entries are keyed by a digest of the identity they were issued for and
//! survive across runs. Unreadable or expired entries are a miss. Writes use
//! atomic rename with no cross-process lock: concurrent refreshes of the same
//! key are both written and the last one wins.

pub mod models;

pub use models::CacheEntry;

use crate::error::Error;
use crate::fs::FileSystem;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub trait CredentialCache: Send + Sync {
    /// Returns the live entry for `key`, if any.
    fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Stores `entry` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), Error>;
}

/// Derives a cache key from the parts that identify a token.
#[must_use]
pub fn cache_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// One JSON file per key under a directory
pub struct FileCache<F: FileSystem> {
    fs: F,
    dir: PathBuf,
}

impl<F: FileSystem> FileCache<F> {
    pub fn new(fs: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(&[key])))
    }
}

impl<F: FileSystem> CredentialCache for FileCache<F> {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let content = self.fs.read_to_string(&self.entry_path(key)).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(target: crate::constants::LOG_TARGET_AUTH, error = %e, "ignoring unreadable cache entry");
                return None;
            }
        };
        (!entry.is_expired(Utc::now())).then_some(entry)
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), Error> {
        self.fs.create_dir_all(&self.dir)?;
        let content = serde_json::to_vec(entry)?;
        self.fs.write_all(&self.entry_path(key), &content)?;
        Ok(())
    }
}

/// Process-local cache, used when nothing should touch disk
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialCache for MemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .cloned()
    }

    fn set(&self, key: &str, entry: &CacheEntry) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::invalid_config("credential cache lock poisoned"))?;
        entries.insert(key.to_string(), entry.clone());
        Ok(())
    }
}

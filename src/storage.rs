//! Local key/value storage — the crate's analog of the browser's
//! localStorage.
//!
//! Three well-known keys, matching the original add-in:
//! - `email_<id>` — draft comment/ratings for one message
//! - `email_<id>_processed` — the last successful submission record
//! - `sendHistory` — the bounded global send log (JSON array)

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::StorageError;

/// Global send-history log key.
pub const HISTORY_KEY: &str = "sendHistory";

/// Key for the per-email draft record.
pub fn draft_key(email_id: &str) -> String {
    format!("email_{email_id}")
}

/// Key for the per-email "processed" marker.
pub fn processed_key(email_id: &str) -> String {
    format!("email_{email_id}_processed")
}

/// String key/value store. Single-writer by assumption; no locking across
/// the read-modify-write cycles layered on top.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value, `None` if the key has never been set.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write (overwrite) a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// List all stored keys, unordered.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}

// ── File-backed implementation ──────────────────────────────────────

/// One file per key under a data directory.
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `base_dir` (created on first write).
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Map a storage key to a filesystem-safe file stem. Message ids can carry
/// base64 characters (`/`, `+`, `=`), which must not reach the path layer.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        fs::write(self.path_for(key), value)
            .await
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        debug!(key, "Storage key written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Write {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut read_dir = match fs::read_dir(&self.base_dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => {
                return Err(StorageError::Read {
                    key: self.base_dir.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| StorageError::Read {
            key: self.base_dir.display().to_string(),
            reason: e.to_string(),
        })? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix(".json") {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

// ── In-memory implementation (tests, ephemeral sessions) ───────────

/// HashMap-backed storage with no persistence.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().expect("storage lock poisoned");
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("storage lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("storage lock poisoned");
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.lock().expect("storage lock poisoned");
        Ok(entries.keys().cloned().collect())
    }
}

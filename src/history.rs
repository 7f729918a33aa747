//! Send history — bounded, append-only log of past submissions.
//!
//! Stored under the `sendHistory` key as a JSON array, newest first,
//! truncated at the configured limit (50). Entries are immutable; the only
//! mutation is eviction of the oldest entries at the bound.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;
use crate::storage::{HISTORY_KEY, Storage};

/// Default history bound, kept from the original add-in.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One successful submission. Serialized with the original's camelCase
/// keys so existing stored logs stay readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawHistoryEntry")]
pub struct HistoryEntry {
    pub email_id: String,
    pub subject: String,
    pub sender: String,
    pub ratings: Vec<String>,
    pub comment: String,
    pub processed_at: DateTime<Utc>,
    #[serde(rename = "sentToCRM")]
    pub sent_to_crm: bool,
}

/// Wire shape, accepting the legacy single-`rating` field older versions
/// of the add-in wrote.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHistoryEntry {
    email_id: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    sender: String,
    #[serde(default)]
    ratings: Vec<String>,
    #[serde(default)]
    rating: Option<String>,
    #[serde(default)]
    comment: String,
    processed_at: DateTime<Utc>,
    #[serde(default, rename = "sentToCRM")]
    sent_to_crm: bool,
}

impl From<RawHistoryEntry> for HistoryEntry {
    fn from(raw: RawHistoryEntry) -> Self {
        let mut ratings = raw.ratings;
        if ratings.is_empty()
            && let Some(rating) = raw.rating
        {
            ratings.push(rating);
        }
        Self {
            email_id: raw.email_id,
            subject: raw.subject,
            sender: raw.sender,
            ratings,
            comment: raw.comment,
            processed_at: raw.processed_at,
            sent_to_crm: raw.sent_to_crm,
        }
    }
}

/// The bounded global send log.
pub struct SendHistory {
    storage: Arc<dyn Storage>,
    limit: usize,
}

impl SendHistory {
    pub fn new(storage: Arc<dyn Storage>, limit: usize) -> Self {
        Self { storage, limit }
    }

    /// Load the full log, newest first. A missing key is an empty log.
    pub async fn all(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        let Some(raw) = self.storage.get(HISTORY_KEY).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            key: HISTORY_KEY.to_string(),
            source,
        })
    }

    /// Prepend an entry, evicting the oldest beyond the bound, and persist.
    pub async fn append(&self, entry: HistoryEntry) -> Result<(), StorageError> {
        let mut entries = self.all().await?;
        entries.insert(0, entry);
        entries.truncate(self.limit);
        let raw = serde_json::to_string(&entries).map_err(|source| StorageError::Corrupt {
            key: HISTORY_KEY.to_string(),
            source,
        })?;
        self.storage.set(HISTORY_KEY, &raw).await?;
        debug!(len = entries.len(), "Send history updated");
        Ok(())
    }

    /// Entries for one message, newest first.
    pub async fn for_email(&self, email_id: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        let mut entries = self.all().await?;
        entries.retain(|e| e.email_id == email_id);
        Ok(entries)
    }
}

//! Host mailbox seam — read-only access to the currently selected message.
//!
//! The host (Outlook in the original) is an external collaborator. The
//! `Mailbox` trait is the only surface the rest of the crate sees;
//! `JsonMailbox` is the adapter the binary wires up, reading the selected
//! item from a JSON file the host side drops for us.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::fs;

use crate::error::MailboxError;

/// Raw metadata of the selected message, before normalization.
///
/// Every field is optional; the host omits what it does not know and the
/// snapshot loader fills in display fallbacks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailboxItem {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub date_time_created: Option<DateTime<Utc>>,
    /// Body text, if the host inlined it with the item.
    #[serde(default)]
    pub body: Option<String>,
}

/// Read-only view of the host mailbox.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Fetch the currently selected message's metadata.
    async fn current_item(&self) -> Result<MailboxItem, MailboxError>;

    /// Fetch the selected message's body, coerced to plain text.
    async fn body_text(&self, item: &MailboxItem) -> Result<String, MailboxError>;
}

/// File-backed host adapter: the selected item lives in one JSON document.
pub struct JsonMailbox {
    item_path: PathBuf,
}

impl JsonMailbox {
    pub fn new(item_path: PathBuf) -> Self {
        Self { item_path }
    }
}

#[async_trait]
impl Mailbox for JsonMailbox {
    async fn current_item(&self) -> Result<MailboxItem, MailboxError> {
        let raw = match fs::read_to_string(&self.item_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MailboxError::HostUnavailable);
            }
            Err(e) => return Err(MailboxError::Host(e.to_string())),
        };

        if raw.trim().is_empty() || raw.trim() == "null" {
            return Err(MailboxError::NoItemSelected);
        }

        serde_json::from_str(&raw).map_err(|e| MailboxError::Host(e.to_string()))
    }

    async fn body_text(&self, item: &MailboxItem) -> Result<String, MailboxError> {
        Ok(item.body.clone().unwrap_or_default())
    }
}

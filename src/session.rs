//! Taskpane session — the explicit context one taskpane load operates on.
//!
//! Replaces the module-level globals of the original (current email, draft
//! selection, status banner) with a value handlers borrow. One session per
//! taskpane load; one user action in flight at a time.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::{SOURCE_LABEL, TrackerConfig};
use crate::diag::Diagnostics;
use crate::error::{StorageError, SubmitError};
use crate::history::{HistoryEntry, SendHistory};
use crate::mailbox::Mailbox;
use crate::snapshot::{EmailSnapshot, SnapshotLoader};
use crate::storage::{Storage, draft_key};
use crate::submit::CrmClient;

/// Flavor of the transient status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

/// A transient status message with its expiry instant.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    expires_at: Instant,
}

/// Per-email draft record (`email_<id>` key). Accepts the legacy
/// single-`rating` shape on read.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DraftRecord {
    #[serde(default)]
    comment: String,
    #[serde(default)]
    ratings: Vec<String>,
    #[serde(default, skip_serializing)]
    rating: Option<String>,
}

/// Explicit session context for one taskpane load.
pub struct TaskpaneSession {
    id: Uuid,
    config: TrackerConfig,
    snapshot: EmailSnapshot,
    comment: String,
    status: Option<StatusMessage>,
    storage: Arc<dyn Storage>,
    crm: CrmClient,
    diag: Arc<Diagnostics>,
}

impl TaskpaneSession {
    /// Load the selected message and restore any saved draft for it.
    ///
    /// Never fails: the loader falls back to a placeholder snapshot and a
    /// broken draft record is dropped with a diagnostics entry.
    pub async fn start(
        config: TrackerConfig,
        mailbox: Arc<dyn Mailbox>,
        storage: Arc<dyn Storage>,
        diag: Arc<Diagnostics>,
    ) -> Self {
        let id = Uuid::new_v4();
        diag.debug("App initialisiert");

        let loader = SnapshotLoader::new(mailbox, Arc::clone(&diag));
        let snapshot = loader.load().await;
        info!(session = %id, email_id = %snapshot.id, "Taskpane session started");

        let history = SendHistory::new(Arc::clone(&storage), config.history_limit);
        let crm = CrmClient::new(
            config.webhook_url.clone(),
            SOURCE_LABEL.into(),
            Arc::clone(&storage),
            history,
            Arc::clone(&diag),
        );

        let mut session = Self {
            id,
            config,
            snapshot,
            comment: String::new(),
            status: None,
            storage,
            crm,
            diag,
        };
        session.restore_draft().await;
        session
    }

    /// Session identifier, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The snapshot this session operates on.
    pub fn snapshot(&self) -> &EmailSnapshot {
        &self.snapshot
    }

    /// Current draft comment.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Toggle a rating in the selection. Returns whether it is now selected.
    pub async fn toggle_rating(&mut self, rating: &str) -> bool {
        let selected = if self.snapshot.ratings.remove(rating) {
            false
        } else {
            self.snapshot.ratings.insert(rating.to_string());
            true
        };
        self.save_draft().await;
        selected
    }

    /// Replace the draft comment.
    pub async fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
        self.save_draft().await;
    }

    /// Submit the current snapshot and comment to the CRM.
    ///
    /// On success the draft selection is cleared and a success banner set;
    /// on failure state is untouched and an error banner set. Either way
    /// the session stays usable.
    pub async fn submit(&mut self) -> Result<HistoryEntry, SubmitError> {
        match self.crm.submit(&self.snapshot, &self.comment).await {
            Ok(entry) => {
                self.comment.clear();
                self.snapshot.ratings.clear();
                self.set_status(StatusKind::Success, "E-Mail erfolgreich an CRM gesendet!");
                Ok(entry)
            }
            Err(e) => {
                self.set_status(StatusKind::Error, format!("Fehler beim Senden an CRM: {e}"));
                Err(e)
            }
        }
    }

    /// Submission history for the current message, newest first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        self.crm.history_for(&self.snapshot.id).await
    }

    /// The current status banner, or `None` once it has expired.
    pub fn status(&self) -> Option<StatusMessage> {
        self.status
            .as_ref()
            .filter(|s| s.expires_at > Instant::now())
            .cloned()
    }

    fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            kind,
            text: text.into(),
            expires_at: Instant::now() + self.config.status_clear_after,
        });
    }

    async fn save_draft(&self) {
        let draft = DraftRecord {
            comment: self.comment.clone(),
            ratings: self.snapshot.ratings.iter().cloned().collect(),
            rating: None,
        };
        let raw = match serde_json::to_string(&draft) {
            Ok(raw) => raw,
            Err(e) => {
                self.diag.error(format!("Entwurf nicht serialisierbar: {e}"));
                return;
            }
        };
        if let Err(e) = self.storage.set(&draft_key(&self.snapshot.id), &raw).await {
            self.diag.error(format!("Entwurf nicht gespeichert: {e}"));
        }
    }

    async fn restore_draft(&mut self) {
        let raw = match self.storage.get(&draft_key(&self.snapshot.id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                self.diag.error(format!("Entwurf nicht lesbar: {e}"));
                return;
            }
        };
        let draft: DraftRecord = match serde_json::from_str(&raw) {
            Ok(draft) => draft,
            Err(e) => {
                self.diag.error(format!("Entwurf verworfen: {e}"));
                return;
            }
        };
        self.comment = draft.comment;
        self.snapshot.ratings = draft.ratings.into_iter().collect();
        // Legacy drafts carried a single rating
        if let Some(rating) = draft.rating {
            self.snapshot.ratings.insert(rating);
        }
        self.diag.debug("Gespeicherter Entwurf wiederhergestellt");
    }
}

//! Email snapshot loader — normalizes the selected message into a local,
//! session-scoped record.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::diag::Diagnostics;
use crate::mailbox::{Mailbox, MailboxItem};

/// Display fallbacks, kept from the original add-in.
const FALLBACK_ID: &str = "unknown";
const FALLBACK_SUBJECT: &str = "Kein Betreff";
const FALLBACK_SENDER: &str = "Unbekannt";

/// Local, read-only copy of the selected message plus the user's rating
/// selection. Built once per session; only the ratings set is mutated.
#[derive(Debug, Clone, Serialize)]
pub struct EmailSnapshot {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub sender_name: String,
    pub received_time: DateTime<Utc>,
    pub body: String,
    /// Selected ratings. Always a set; the single-select UI is the size-1
    /// case.
    pub ratings: BTreeSet<String>,
}

impl EmailSnapshot {
    /// Normalize a host item into a snapshot, applying display fallbacks
    /// for anything the host left out.
    pub fn from_item(item: &MailboxItem, body: String) -> Self {
        Self {
            id: item.item_id.clone().unwrap_or_else(|| FALLBACK_ID.into()),
            subject: item
                .subject
                .clone()
                .unwrap_or_else(|| FALLBACK_SUBJECT.into()),
            sender: item
                .from_address
                .clone()
                .unwrap_or_else(|| FALLBACK_SENDER.into()),
            sender_name: item
                .from_name
                .clone()
                .unwrap_or_else(|| FALLBACK_SENDER.into()),
            received_time: item.date_time_created.unwrap_or_else(Utc::now),
            body,
            ratings: BTreeSet::new(),
        }
    }

    /// Synthetic record shown when the host cannot supply the real message.
    pub fn placeholder() -> Self {
        Self {
            id: format!("test-{}", Utc::now().timestamp_millis()),
            subject: "Test E-Mail".into(),
            sender: "test@example.com".into(),
            sender_name: "Test Sender".into(),
            received_time: Utc::now(),
            body: "Dies ist eine Test-E-Mail für das CRM Add-in.".into(),
            ratings: BTreeSet::new(),
        }
    }

    /// Whether this snapshot is the synthetic fallback.
    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with("test-")
    }
}

/// Loads the active message from the host. Fails open: any host failure
/// yields a placeholder snapshot instead of an error.
pub struct SnapshotLoader {
    mailbox: Arc<dyn Mailbox>,
    diag: Arc<Diagnostics>,
}

impl SnapshotLoader {
    pub fn new(mailbox: Arc<dyn Mailbox>, diag: Arc<Diagnostics>) -> Self {
        Self { mailbox, diag }
    }

    /// Single attempt, no retry. Body retrieval failure degrades to an
    /// empty body rather than failing the whole load.
    pub async fn load(&self) -> EmailSnapshot {
        self.diag.debug("Starte E-Mail Laden...");

        let item = match self.mailbox.current_item().await {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "Host item unavailable, using placeholder snapshot");
                self.diag.error(format!("Fehler beim Laden der E-Mail: {e}"));
                return EmailSnapshot::placeholder();
            }
        };

        let body = match self.mailbox.body_text(&item).await {
            Ok(body) => body,
            Err(e) => {
                self.diag
                    .error(format!("Fehler beim Laden des E-Mail Body: {e}"));
                String::new()
            }
        };

        let snapshot = EmailSnapshot::from_item(&item, body);
        match serde_json::to_string(&snapshot) {
            Ok(json) => self.diag.debug(format!("E-Mail Item gefunden: {json}")),
            Err(_) => self.diag.debug(format!("E-Mail Item gefunden: {}", snapshot.id)),
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::MailboxError;

    struct FailingMailbox;

    #[async_trait]
    impl Mailbox for FailingMailbox {
        async fn current_item(&self) -> Result<MailboxItem, MailboxError> {
            Err(MailboxError::HostUnavailable)
        }

        async fn body_text(&self, _item: &MailboxItem) -> Result<String, MailboxError> {
            Err(MailboxError::HostUnavailable)
        }
    }

    struct FixedMailbox {
        item: MailboxItem,
        body_fails: bool,
    }

    #[async_trait]
    impl Mailbox for FixedMailbox {
        async fn current_item(&self) -> Result<MailboxItem, MailboxError> {
            Ok(self.item.clone())
        }

        async fn body_text(&self, item: &MailboxItem) -> Result<String, MailboxError> {
            if self.body_fails {
                Err(MailboxError::Host("coercion failed".into()))
            } else {
                Ok(item.body.clone().unwrap_or_default())
            }
        }
    }

    fn diag() -> Arc<Diagnostics> {
        Arc::new(Diagnostics::default())
    }

    #[tokio::test]
    async fn host_failure_yields_placeholder() {
        let diag = diag();
        let loader = SnapshotLoader::new(Arc::new(FailingMailbox), Arc::clone(&diag));
        let snapshot = loader.load().await;
        assert!(snapshot.is_placeholder());
        assert_eq!(snapshot.sender, "test@example.com");
        // Failure was recorded, not propagated
        assert_eq!(diag.error_entries().len(), 1);
    }

    #[tokio::test]
    async fn normalizes_missing_fields() {
        let loader = SnapshotLoader::new(
            Arc::new(FixedMailbox {
                item: MailboxItem {
                    item_id: Some("m1".into()),
                    ..Default::default()
                },
                body_fails: false,
            }),
            diag(),
        );
        let snapshot = loader.load().await;
        assert_eq!(snapshot.id, "m1");
        assert_eq!(snapshot.subject, "Kein Betreff");
        assert_eq!(snapshot.sender, "Unbekannt");
        assert_eq!(snapshot.sender_name, "Unbekannt");
        assert!(snapshot.ratings.is_empty());
    }

    #[tokio::test]
    async fn body_failure_degrades_to_empty_body() {
        let loader = SnapshotLoader::new(
            Arc::new(FixedMailbox {
                item: MailboxItem {
                    item_id: Some("m1".into()),
                    subject: Some("Angebot".into()),
                    body: Some("ignored".into()),
                    ..Default::default()
                },
                body_fails: true,
            }),
            diag(),
        );
        let snapshot = loader.load().await;
        assert!(!snapshot.is_placeholder());
        assert_eq!(snapshot.body, "");
        assert_eq!(snapshot.subject, "Angebot");
    }
}

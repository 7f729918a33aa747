//! CRM submission — validates the snapshot, POSTs it to the webhook, and
//! records the outcome locally.
//!
//! Delivery is at most once: there is no retry and no idempotency key, so a
//! user re-submitting after a failure can duplicate the remote record. On
//! any failure local state is left untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::diag::Diagnostics;
use crate::error::{StorageError, SubmitError};
use crate::history::{HistoryEntry, SendHistory};
use crate::snapshot::EmailSnapshot;
use crate::storage::{Storage, draft_key, processed_key};

/// Webhook client plus the local bookkeeping a successful send entails.
pub struct CrmClient {
    client: reqwest::Client,
    webhook_url: String,
    source: String,
    storage: Arc<dyn Storage>,
    history: SendHistory,
    diag: Arc<Diagnostics>,
}

impl CrmClient {
    pub fn new(
        webhook_url: String,
        source: String,
        storage: Arc<dyn Storage>,
        history: SendHistory,
        diag: Arc<Diagnostics>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
            source,
            storage,
            history,
            diag,
        }
    }

    /// Submit the snapshot with the given comment.
    ///
    /// Precondition: at least one rating is selected; otherwise fails
    /// before any network traffic. On 2xx the history entry is appended,
    /// the processed marker written, and the draft cleared.
    pub async fn submit(
        &self,
        snapshot: &EmailSnapshot,
        comment: &str,
    ) -> Result<HistoryEntry, SubmitError> {
        if snapshot.ratings.is_empty() {
            self.diag.error("Bitte mindestens eine Bewertung auswählen");
            return Err(SubmitError::NoRating);
        }

        let processed_at = Utc::now();
        let payload = webhook_payload(snapshot, comment, processed_at, &self.source);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .inspect_err(|e| {
                self.diag.error(format!("Fehler beim Senden an CRM: {e}"));
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Webhook rejected submission");
            self.diag
                .error(format!("Fehler beim Senden an CRM: HTTP {status}"));
            return Err(SubmitError::Http { status });
        }

        let entry = HistoryEntry {
            email_id: snapshot.id.clone(),
            subject: snapshot.subject.clone(),
            sender: snapshot.sender.clone(),
            ratings: snapshot.ratings.iter().cloned().collect(),
            comment: comment.to_string(),
            processed_at,
            sent_to_crm: true,
        };

        self.record_success(&entry).await?;

        info!(email_id = %entry.email_id, "Submission sent to CRM");
        self.diag.debug(format!(
            "E-Mail gesendet: {} (ID: {})",
            entry.subject, entry.email_id
        ));
        Ok(entry)
    }

    /// Persist the processed marker and history entry, then drop the draft.
    async fn record_success(&self, entry: &HistoryEntry) -> Result<(), StorageError> {
        let marker = serde_json::to_string(entry).map_err(|source| StorageError::Corrupt {
            key: processed_key(&entry.email_id),
            source,
        })?;
        self.storage
            .set(&processed_key(&entry.email_id), &marker)
            .await?;
        self.history.append(entry.clone()).await?;
        self.storage.remove(&draft_key(&entry.email_id)).await?;
        Ok(())
    }

    /// Newest-first submission history for one message.
    pub async fn history_for(&self, email_id: &str) -> Result<Vec<HistoryEntry>, StorageError> {
        self.history.for_email(email_id).await
    }
}

/// Build the webhook body: `{"email": {...}}` with snake_case fields.
fn webhook_payload(
    snapshot: &EmailSnapshot,
    comment: &str,
    processed_at: DateTime<Utc>,
    source: &str,
) -> serde_json::Value {
    serde_json::json!({
        "email": {
            "id": snapshot.id,
            "subject": snapshot.subject,
            "sender_email": snapshot.sender,
            "sender_name": snapshot.sender_name,
            "received_time": snapshot.received_time,
            "ratings": snapshot.ratings,
            "comment": comment,
            "processed_at": processed_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "source": source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SOURCE_LABEL;
    use crate::history::DEFAULT_HISTORY_LIMIT;
    use crate::storage::MemoryStorage;

    fn snapshot_with_ratings(ratings: &[&str]) -> EmailSnapshot {
        let mut snapshot = EmailSnapshot::placeholder();
        snapshot.id = "m1".into();
        snapshot.subject = "Angebot".into();
        snapshot.sender = "alice@example.com".into();
        snapshot.ratings = ratings.iter().map(|r| r.to_string()).collect();
        snapshot
    }

    fn client(storage: Arc<dyn Storage>) -> CrmClient {
        // Closed port: any network attempt would surface as SubmitError::Network
        CrmClient::new(
            "http://127.0.0.1:9/hook".into(),
            SOURCE_LABEL.into(),
            Arc::clone(&storage),
            SendHistory::new(storage, DEFAULT_HISTORY_LIMIT),
            Arc::new(Diagnostics::default()),
        )
    }

    #[tokio::test]
    async fn missing_rating_fails_before_network() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let crm = client(Arc::clone(&storage));

        let result = crm.submit(&snapshot_with_ratings(&[]), "ok").await;
        assert!(matches!(result, Err(SubmitError::NoRating)));

        // Nothing was recorded
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[test]
    fn payload_matches_webhook_contract() {
        let snapshot = snapshot_with_ratings(&["Interessiert", "Rückruf"]);
        let processed_at = Utc::now();
        let payload = webhook_payload(&snapshot, "bitte melden", processed_at, SOURCE_LABEL);

        let email = &payload["email"];
        assert_eq!(email["id"], "m1");
        assert_eq!(email["sender_email"], "alice@example.com");
        assert_eq!(email["ratings"].as_array().unwrap().len(), 2);
        assert_eq!(email["comment"], "bitte melden");
        assert_eq!(email["source"], SOURCE_LABEL);
        assert!(email["processed_at"].as_str().unwrap().ends_with('Z'));
    }
}

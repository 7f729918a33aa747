//! End-to-end submission flow against a canned local webhook.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use lead_tracker::error::MailboxError;
use lead_tracker::{
    Diagnostics, Mailbox, MailboxItem, MemoryStorage, Storage, StatusKind, SubmitError,
    TaskpaneSession, TrackerConfig,
};

struct FixedMailbox(MailboxItem);

#[async_trait]
impl Mailbox for FixedMailbox {
    async fn current_item(&self) -> Result<MailboxItem, MailboxError> {
        Ok(self.0.clone())
    }

    async fn body_text(&self, item: &MailboxItem) -> Result<String, MailboxError> {
        Ok(item.body.clone().unwrap_or_default())
    }
}

fn selected_item() -> MailboxItem {
    MailboxItem {
        item_id: Some("m1".into()),
        subject: Some("Angebot".into()),
        from_address: Some("alice@example.com".into()),
        from_name: Some("Alice".into()),
        body: Some("Hallo, ich habe Interesse.".into()),
        ..Default::default()
    }
}

/// Accept exactly one HTTP request, answer with `status_line`, and hand the
/// raw request back for inspection.
async fn spawn_webhook(status_line: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let lower = line.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .and_then(|v| v.trim().parse::<usize>().ok())
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response =
            format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&buf).to_string()
    });

    (format!("http://{addr}/hook"), handle)
}

async fn start_session(webhook_url: String, storage: Arc<dyn Storage>) -> TaskpaneSession {
    let config = TrackerConfig {
        webhook_url,
        ..TrackerConfig::default()
    };
    TaskpaneSession::start(
        config,
        Arc::new(FixedMailbox(selected_item())),
        storage,
        Arc::new(Diagnostics::default()),
    )
    .await
}

#[tokio::test]
async fn successful_submission_records_history_and_clears_draft() {
    let (url, webhook) = spawn_webhook("200 OK").await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    let mut session = start_session(url, Arc::clone(&storage)).await;
    session.toggle_rating("Interessiert").await;
    session.set_comment("ok").await;

    let entry = session.submit().await.expect("submission succeeds");
    assert_eq!(entry.email_id, "m1");
    assert!(entry.sent_to_crm);

    // The webhook saw the documented payload shape
    let request = webhook.await.unwrap();
    let body_start = request.find("\r\n\r\n").unwrap() + 4;
    let payload: serde_json::Value = serde_json::from_str(&request[body_start..]).unwrap();
    let email = &payload["email"];
    assert_eq!(email["id"], "m1");
    assert_eq!(email["sender_email"], "alice@example.com");
    assert_eq!(email["sender_name"], "Alice");
    assert_eq!(email["ratings"], serde_json::json!(["Interessiert"]));
    assert_eq!(email["comment"], "ok");
    assert_eq!(email["source"], "Outlook Add-in CRM Manager");

    // sendHistory[0] matches the submission
    let history = session.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].email_id, "m1");
    assert_eq!(history[0].ratings, vec!["Interessiert"]);
    assert_eq!(history[0].comment, "ok");
    assert!(history[0].sent_to_crm);

    // Draft selection was cleared, processed marker written, draft key gone
    assert_eq!(session.comment(), "");
    assert!(session.snapshot().ratings.is_empty());
    assert!(
        storage
            .get("email_m1_processed")
            .await
            .unwrap()
            .is_some()
    );
    assert!(storage.get("email_m1").await.unwrap().is_none());

    let status = session.status().expect("success banner");
    assert_eq!(status.kind, StatusKind::Success);
}

#[tokio::test]
async fn rejected_submission_leaves_local_state_unchanged() {
    let (url, webhook) = spawn_webhook("500 Internal Server Error").await;
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    let mut session = start_session(url, Arc::clone(&storage)).await;
    session.toggle_rating("Interessiert").await;
    session.set_comment("ok").await;

    let result = session.submit().await;
    match result {
        Err(SubmitError::Http { status }) => assert_eq!(status.as_u16(), 500),
        other => panic!("expected HTTP error, got {other:?}"),
    }
    webhook.await.unwrap();

    // No history, draft intact, error banner shown
    assert!(session.history().await.unwrap().is_empty());
    assert_eq!(session.comment(), "ok");
    assert!(session.snapshot().ratings.contains("Interessiert"));
    assert!(storage.get("email_m1_processed").await.unwrap().is_none());
    assert_eq!(session.status().unwrap().kind, StatusKind::Error);
}

#[tokio::test]
async fn resubmitting_same_email_stacks_history_newest_first() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());

    for comment in ["erste", "zweite"] {
        let (url, webhook) = spawn_webhook("200 OK").await;
        let mut session = start_session(url, Arc::clone(&storage)).await;
        session.toggle_rating("Interessiert").await;
        session.set_comment(comment).await;
        session.submit().await.expect("submission succeeds");
        webhook.await.unwrap();
    }

    let (url, _webhook) = spawn_webhook("200 OK").await;
    let session = start_session(url, storage).await;
    let history = session.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].comment, "zweite");
    assert_eq!(history[1].comment, "erste");
}

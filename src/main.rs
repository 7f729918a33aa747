use std::sync::Arc;

use lead_tracker::{
    Diagnostics, FileStorage, JsonMailbox, TaskpaneSession, TrackerConfig,
};

/// One taskpane load as a CLI run: read the selected item the host side
/// dropped as JSON, restore the draft, optionally submit, print history.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TrackerConfig::from_env()?;

    let item_path = std::env::var("LEAD_TRACKER_ITEM_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| config.data_dir.join("selected-item.json"));

    eprintln!("📧 Lead Tracker v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: {}", config.webhook_url);
    eprintln!("   Data dir: {}", config.data_dir.display());
    eprintln!("   Selected item: {}\n", item_path.display());

    let diag = Arc::new(Diagnostics::new(
        config.debug_log_capacity,
        config.error_log_capacity,
    ));
    let storage = Arc::new(FileStorage::new(config.data_dir.clone()));
    let mailbox = Arc::new(JsonMailbox::new(item_path));

    let mut session = TaskpaneSession::start(config, mailbox, storage, diag).await;

    {
        let snapshot = session.snapshot();
        eprintln!(
            "   Von: {} ({})",
            snapshot.sender_name, snapshot.sender
        );
        eprintln!("   Betreff: {}", snapshot.subject);
        eprintln!("   Empfangen: {}", snapshot.received_time.to_rfc3339());
        if snapshot.is_placeholder() {
            eprintln!("   (Platzhalter — kein Host-Item verfügbar)");
        }
        eprintln!();
    }

    // Ratings/comment from env drive an immediate submission; without them
    // this run just shows the current state.
    if let Ok(ratings) = std::env::var("LEAD_TRACKER_RATINGS") {
        for rating in ratings.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            session.toggle_rating(rating).await;
        }
        if let Ok(comment) = std::env::var("LEAD_TRACKER_COMMENT") {
            session.set_comment(comment).await;
        }

        match session.submit().await {
            Ok(entry) => eprintln!("   Gesendet: {} um {}", entry.subject, entry.processed_at),
            Err(e) => eprintln!("   Senden fehlgeschlagen: {e}"),
        }
        if let Some(status) = session.status() {
            eprintln!("   Status: {}", status.text);
        }
    }

    let history = session.history().await?;
    if history.is_empty() {
        eprintln!("   Noch keine Sendungen für diese E-Mail");
    } else {
        eprintln!("   Sendungen für diese E-Mail:");
        for entry in &history {
            eprintln!(
                "   - {} | {} | {}",
                entry.processed_at.to_rfc3339(),
                entry.ratings.join(", "),
                if entry.comment.is_empty() {
                    "Kein Kommentar"
                } else {
                    &entry.comment
                }
            );
        }
    }

    Ok(())
}

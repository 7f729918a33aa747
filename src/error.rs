//! Error types for lead-tracker.

use reqwest::StatusCode;

/// Top-level error type for the tracker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Host mailbox errors — the ways the host can refuse to hand over
/// the selected message.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Host mailbox context is not available")]
    HostUnavailable,

    #[error("No message is currently selected")]
    NoItemSelected,

    #[error("Host call failed: {0}")]
    Host(String),
}

/// Local storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to read key {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Failed to write key {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Corrupt value under key {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Webhook submission errors.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("At least one rating must be selected")]
    NoRating,

    #[error("Webhook request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook rejected submission: HTTP {status}")]
    Http { status: StatusCode },

    #[error("Failed to record submission locally: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for the tracker.
pub type Result<T> = std::result::Result<T, Error>;

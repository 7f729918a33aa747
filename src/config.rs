//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Webhook URL the original add-in shipped with; overridable via
/// `LEAD_TRACKER_WEBHOOK_URL`.
pub const DEFAULT_WEBHOOK_URL: &str = "https://services.leadconnectorhq.com/hooks/mQuST3AEkqT3w3s1mfor/webhook-trigger/d7889f1c-5fbb-46fe-b720-2bcd9fab7c63";

/// `source` field stamped into every webhook payload.
pub const SOURCE_LABEL: &str = "Outlook Add-in CRM Manager";

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// CRM webhook endpoint (POST, JSON).
    pub webhook_url: String,
    /// Maximum entries kept in the send-history log.
    pub history_limit: usize,
    /// How long a transient status message stays visible.
    pub status_clear_after: Duration,
    /// Capacity of the debug ring buffer.
    pub debug_log_capacity: usize,
    /// Capacity of the error ring buffer.
    pub error_log_capacity: usize,
    /// Directory for file-backed storage (binary only; tests use memory).
    pub data_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            history_limit: 50,
            status_clear_after: Duration::from_secs(5),
            debug_log_capacity: 20,
            error_log_capacity: 10,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl TrackerConfig {
    /// Build config from environment variables, falling back to defaults.
    /// An env var that is set but unparseable is an error, not a fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let webhook_url =
            std::env::var("LEAD_TRACKER_WEBHOOK_URL").unwrap_or(defaults.webhook_url);
        if webhook_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "LEAD_TRACKER_WEBHOOK_URL".into(),
                message: "must not be empty".into(),
            });
        }

        let history_limit = parse_env("LEAD_TRACKER_HISTORY_LIMIT", defaults.history_limit)?;
        if history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LEAD_TRACKER_HISTORY_LIMIT".into(),
                message: "must be at least 1".into(),
            });
        }

        let status_clear_after = parse_env(
            "LEAD_TRACKER_STATUS_CLEAR_SECS",
            defaults.status_clear_after.as_secs(),
        )
        .map(Duration::from_secs)?;

        let data_dir = std::env::var("LEAD_TRACKER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        Ok(Self {
            webhook_url,
            history_limit,
            status_clear_after,
            debug_log_capacity: defaults.debug_log_capacity,
            error_log_capacity: defaults.error_log_capacity,
            data_dir,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse {raw:?}"),
        }),
        Err(_) => Ok(default),
    }
}

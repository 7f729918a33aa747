//! lead-tracker — taskpane core for rating emails into a CRM webhook.

pub mod config;
pub mod diag;
pub mod error;
pub mod history;
pub mod mailbox;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod submit;

pub use config::TrackerConfig;
pub use diag::Diagnostics;
pub use error::{Error, MailboxError, Result, StorageError, SubmitError};
pub use history::{HistoryEntry, SendHistory};
pub use mailbox::{JsonMailbox, Mailbox, MailboxItem};
pub use session::{StatusKind, TaskpaneSession};
pub use snapshot::{EmailSnapshot, SnapshotLoader};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use submit::CrmClient;

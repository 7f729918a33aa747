//! Diagnostics — the in-memory log buffers behind the taskpane's debug panel.
//!
//! The original intercepted `console.log`/`console.error`; here both
//! components get an explicit handle instead. Entries are timestamped and
//! kept in two bounded ring buffers (debug and error), and every entry is
//! mirrored to `tracing` so the buffers never become the only record.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;
use tracing::{debug, error};

/// Default debug buffer capacity.
pub const DEBUG_CAPACITY: usize = 20;
/// Default error buffer capacity.
pub const ERROR_CAPACITY: usize = 10;

struct Buffers {
    debug: VecDeque<String>,
    error: VecDeque<String>,
}

/// Bounded diagnostic log, shared by the loader and the submitter.
pub struct Diagnostics {
    debug_capacity: usize,
    error_capacity: usize,
    buffers: Mutex<Buffers>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEBUG_CAPACITY, ERROR_CAPACITY)
    }
}

impl Diagnostics {
    /// Create a diagnostics log with the given buffer capacities.
    pub fn new(debug_capacity: usize, error_capacity: usize) -> Self {
        Self {
            debug_capacity,
            error_capacity,
            buffers: Mutex::new(Buffers {
                debug: VecDeque::with_capacity(debug_capacity),
                error: VecDeque::with_capacity(error_capacity),
            }),
        }
    }

    /// Record a debug entry, evicting the oldest beyond capacity.
    pub fn debug(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!(target: "taskpane", "{message}");
        let mut buffers = self.buffers.lock().expect("diagnostics lock poisoned");
        if buffers.debug.len() >= self.debug_capacity {
            buffers.debug.pop_front();
        }
        buffers.debug.push_back(stamp(message));
    }

    /// Record an error entry, evicting the oldest beyond capacity.
    pub fn error(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        error!(target: "taskpane", "{message}");
        let mut buffers = self.buffers.lock().expect("diagnostics lock poisoned");
        if buffers.error.len() >= self.error_capacity {
            buffers.error.pop_front();
        }
        buffers.error.push_back(stamp(message));
    }

    /// Snapshot of the debug buffer, oldest first.
    pub fn debug_entries(&self) -> Vec<String> {
        let buffers = self.buffers.lock().expect("diagnostics lock poisoned");
        buffers.debug.iter().cloned().collect()
    }

    /// Snapshot of the error buffer, oldest first.
    pub fn error_entries(&self) -> Vec<String> {
        let buffers = self.buffers.lock().expect("diagnostics lock poisoned");
        buffers.error.iter().cloned().collect()
    }
}

fn stamp(message: &str) -> String {
    format!("[{}] {}", Utc::now().format("%H:%M:%S"), message)
}

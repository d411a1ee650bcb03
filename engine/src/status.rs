//! User-visible status notices.
//!
//! Nothing in the engine fails loudly; degraded paths publish a [`Status`]
//! instead. The UI decides how to show it (toast, badge, log line).

use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Remote mirror indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// No usable remote configuration; local only for this session
    Disabled,
    Connecting,
    /// Remote document replaced local data
    Pulled,
    /// Remote was empty and received the local snapshot
    Bootstrapped,
    /// The newest scheduled state reached the remote
    Synced,
    /// A pull or push failed
    Error(String),
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Saved { label: String },
    /// Local write refused because storage is full
    QuotaExceeded,
    /// Local write failed for another reason
    WriteFailed { reason: String },
    Imported,
    InvalidImport,
    Restored { index: usize },
    HistoryCleared,
    Wiped,
    Sync(SyncStatus),
}

impl Status {
    /// Whether this status reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Status::QuotaExceeded
                | Status::WriteFailed { .. }
                | Status::InvalidImport
                | Status::Sync(SyncStatus::Error(_))
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Disabled => write!(f, "Cloud: off (local only)"),
            SyncStatus::Connecting => write!(f, "Cloud: connecting..."),
            SyncStatus::Pulled => write!(f, "Cloud: loaded latest data"),
            SyncStatus::Bootstrapped => write!(f, "Cloud: first upload done"),
            SyncStatus::Synced => write!(f, "Cloud: synced"),
            SyncStatus::Error(reason) => write!(f, "Cloud: error ({reason})"),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Saved { label } => write!(f, "Saved ({label})"),
            Status::QuotaExceeded => write!(
                f,
                "Storage is full: changes were not saved. Remove images or export a backup."
            ),
            Status::WriteFailed { reason } => write!(f, "Could not save: {reason}"),
            Status::Imported => write!(f, "Imported successfully"),
            Status::InvalidImport => write!(f, "Import failed (invalid file)"),
            Status::Restored { index } => write!(f, "Backup #{} restored", index + 1),
            Status::HistoryCleared => write!(f, "History cleared"),
            Status::Wiped => write!(f, "All data erased"),
            Status::Sync(sync) => write!(f, "{sync}"),
        }
    }
}

/// Receiver of status notices.
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: Status);
}

/// Drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn publish(&self, _status: Status) {}
}

impl StatusSink for mpsc::UnboundedSender<Status> {
    fn publish(&self, status: Status) {
        // Receiver gone means nobody is listening
        let _ = self.send(status);
    }
}

/// Keeps every notice in memory; handy for tests and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    entries: Arc<Mutex<Vec<Status>>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn entries(&self) -> Vec<Status> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recent notice.
    pub fn last(&self) -> Option<Status> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn contains(&self, status: &Status) -> bool {
        self.entries().contains(status)
    }
}

impl StatusSink for StatusLog {
    fn publish(&self, status: Status) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings() {
        assert_eq!(
            Status::Saved {
                label: "import".into()
            }
            .to_string(),
            "Saved (import)"
        );
        assert_eq!(Status::Restored { index: 0 }.to_string(), "Backup #1 restored");
        assert_eq!(
            Status::Sync(SyncStatus::Error("timeout".into())).to_string(),
            "Cloud: error (timeout)"
        );
        assert!(Status::QuotaExceeded.to_string().starts_with("Storage is full"));
    }

    #[test]
    fn error_classification() {
        assert!(Status::QuotaExceeded.is_error());
        assert!(Status::InvalidImport.is_error());
        assert!(Status::Sync(SyncStatus::Error("x".into())).is_error());
        assert!(!Status::Sync(SyncStatus::Synced).is_error());
        assert!(!Status::Imported.is_error());
    }

    #[test]
    fn channel_sink_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.publish(Status::Wiped);
        assert_eq!(rx.try_recv().unwrap(), Status::Wiped);

        drop(rx);
        tx.publish(Status::Wiped);
    }

    #[test]
    fn log_keeps_order() {
        let log = StatusLog::new();
        log.publish(Status::Imported);
        log.publish(Status::HistoryCleared);

        assert_eq!(log.entries(), vec![Status::Imported, Status::HistoryCleared]);
        assert_eq!(log.last(), Some(Status::HistoryCleared));
        assert!(log.contains(&Status::Imported));
    }
}

//! Error types for the podvault engine.

use crate::mirror::RemoteError;
use thiserror::Error;

/// All possible errors from the podvault engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Storage errors
    #[error("storage quota exceeded while writing '{key}'")]
    QuotaExceeded { key: String },

    #[error("failed to write '{key}': {reason}")]
    StorageWrite { key: String, reason: String },

    #[error("failed to read '{key}': {reason}")]
    StorageRead { key: String, reason: String },

    // Document errors
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    // History errors
    #[error("backup not found at index {0}")]
    BackupNotFound(usize),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl Error {
    /// Whether this error means the host storage is full.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Error::QuotaExceeded { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

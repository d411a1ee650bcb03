//! Bounded rollback history.
//!
//! The ring is a newest-first list of envelopes stored as one JSON array
//! under a single key. Entries are unique by `(savedAt, label)` and the list
//! never grows past its capacity.

use crate::kv::KeyValueStore;
use crate::{error::Result, Envelope, Snapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default ring capacity.
pub const MAX_BACKUPS: usize = 5;

/// Storage key of the ring.
pub const BACKUPS_KEY: &str = "podcast_dashboard_backups";

/// Single-slot backup written by older versions. Read-only fallback.
pub const LEGACY_BACKUP_KEY: &str = "podcast_dashboard_backup";

/// One line of the history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub index: usize,
    pub label: String,
    pub saved_at: String,
    pub transactions: usize,
    pub guests: usize,
    pub episodes: usize,
}

impl BackupSummary {
    fn new(index: usize, envelope: &Envelope) -> Self {
        Self {
            index,
            label: envelope.label.clone(),
            saved_at: envelope.saved_at.clone(),
            transactions: envelope.data.transactions.len(),
            guests: envelope.data.guests.len(),
            episodes: envelope.data.episodes.len(),
        }
    }
}

/// Location and capacity of the history ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRing {
    key: String,
    legacy_key: String,
    capacity: usize,
}

impl Default for BackupRing {
    fn default() -> Self {
        Self::new(BACKUPS_KEY, LEGACY_BACKUP_KEY, MAX_BACKUPS)
    }
}

impl BackupRing {
    pub fn new(key: impl Into<String>, legacy_key: impl Into<String>, capacity: usize) -> Self {
        Self {
            key: key.into(),
            legacy_key: legacy_key.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All entries, newest first.
    ///
    /// Unreadable storage or entries are skipped; the ring is best effort
    /// and must never stop the primary snapshot from loading.
    pub fn entries(&self, kv: &impl KeyValueStore) -> Vec<Envelope> {
        let raw = match kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "backup ring unreadable");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items.iter().filter_map(Envelope::from_value).collect(),
            Ok(_) | Err(_) => {
                tracing::warn!(key = %self.key, "backup ring is not a list, ignoring it");
                Vec::new()
            }
        }
    }

    /// Add `envelope` at the head.
    ///
    /// An entry with the same `(savedAt, label)` is replaced, then the ring
    /// is truncated to capacity and written back in one store write.
    pub fn push(&self, kv: &mut impl KeyValueStore, envelope: Envelope) -> Result<()> {
        let mut entries = self.entries(&*kv);
        entries.retain(|e| e.key() != envelope.key());
        entries.insert(0, envelope);
        entries.truncate(self.capacity);

        tracing::debug!(
            size = entries.len(),
            label = %entries[0].label,
            "rotating backup ring"
        );
        self.write(kv, &entries)
    }

    /// Head of the ring, else the legacy single slot, else nothing.
    pub fn latest(&self, kv: &impl KeyValueStore) -> Option<Envelope> {
        if let Some(head) = self.entries(kv).into_iter().next() {
            return Some(head);
        }
        kv.get(&self.legacy_key)
            .ok()
            .flatten()
            .and_then(|raw| Envelope::from_json(&raw))
    }

    /// Replace the whole history with a single restore point.
    pub fn clear_to_snapshot(&self, kv: &mut impl KeyValueStore, envelope: Envelope) -> Result<()> {
        self.write(kv, std::slice::from_ref(&envelope))?;
        kv.remove(&self.legacy_key)
    }

    /// Normalized data of entry `index`, or `None` when out of range.
    pub fn restore(&self, kv: &impl KeyValueStore, index: usize) -> Option<Snapshot> {
        self.entries(kv).into_iter().nth(index).map(|e| e.data)
    }

    pub fn summaries(&self, kv: &impl KeyValueStore) -> Vec<BackupSummary> {
        self.entries(kv)
            .iter()
            .enumerate()
            .map(|(i, e)| BackupSummary::new(i, e))
            .collect()
    }

    fn write(&self, kv: &mut impl KeyValueStore, entries: &[Envelope]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        kv.set(&self.key, &json)
    }
}

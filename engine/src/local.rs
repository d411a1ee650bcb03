//! Local durable store - the primary snapshot plus its history ring.
//!
//! Local storage is authoritative. Writes are synchronous and ordered: once
//! [`LocalStore::save`] returns, every later [`LocalStore::load`] or
//! [`LocalStore::latest_backup`] observes it.

use crate::backup::{BackupRing, BackupSummary};
use crate::envelope::{labels, snapshot_from_document};
use crate::kv::KeyValueStore;
use crate::status::{Status, StatusSink};
use crate::{error::Result, Envelope, Error, Snapshot};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Storage key of the primary envelope.
pub const PRIMARY_KEY: &str = "podcast_dashboard_db";

/// Primary key of the previous dashboard version (bare snapshot, no
/// envelope). Read once as a migration source when the primary is empty.
pub const LEGACY_PRIMARY_KEY: &str = "podcast_dashboard_db_v2";

/// The snapshot's home on the host.
#[derive(Debug, Clone)]
pub struct LocalStore<K> {
    kv: K,
    ring: BackupRing,
}

impl<K: KeyValueStore> LocalStore<K> {
    /// Wrap a key-value store with the default ring.
    pub fn new(kv: K) -> Self {
        Self::with_ring(kv, BackupRing::default())
    }

    pub fn with_ring(kv: K, ring: BackupRing) -> Self {
        Self { kv, ring }
    }

    /// Underlying storage.
    pub fn kv(&self) -> &K {
        &self.kv
    }

    pub fn kv_mut(&mut self) -> &mut K {
        &mut self.kv
    }

    pub fn into_inner(self) -> K {
        self.kv
    }

    /// Load the current snapshot.
    ///
    /// Absence and corruption are a cold start, not an error: both yield
    /// [`Snapshot::default`].
    pub fn load(&self) -> Snapshot {
        if let Some(snapshot) = self.read_document(PRIMARY_KEY) {
            return snapshot;
        }
        if let Some(snapshot) = self.read_document(LEGACY_PRIMARY_KEY) {
            tracing::info!("migrating snapshot from legacy storage key");
            return snapshot;
        }
        Snapshot::default()
    }

    fn read_document(&self, key: &str) -> Option<Snapshot> {
        let raw = match self.kv.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "stored snapshot unreadable");
                return None;
            }
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "stored snapshot is not valid JSON");
                return None;
            }
        };
        snapshot_from_document(&value).ok()
    }

    /// Persist `snapshot` under `label` and rotate history.
    ///
    /// The previous primary value goes into the ring as `before_<label>`
    /// (keeping its own `savedAt`). With no previous value the new envelope
    /// itself seeds the ring. A ring failure is logged but does not block
    /// the primary write.
    pub fn try_save(
        &mut self,
        snapshot: &Snapshot,
        label: &str,
        saved_at: DateTime<Utc>,
    ) -> Result<Envelope> {
        let envelope = Envelope::new(snapshot.clone(), label, saved_at);
        let json = envelope.to_json()?;

        let previous = self
            .kv
            .get(PRIMARY_KEY)
            .ok()
            .flatten()
            .and_then(|raw| Envelope::from_json(&raw));

        let history_entry = match previous {
            Some(mut previous) => {
                previous.label = labels::before(label);
                previous
            }
            None => envelope.clone(),
        };
        if let Err(e) = self.ring.push(&mut self.kv, history_entry) {
            tracing::warn!(label, error = %e, "backup rotation failed");
        }

        self.kv.set(PRIMARY_KEY, &json)?;
        tracing::debug!(label, saved_at = %envelope.saved_at, "snapshot saved");
        Ok(envelope)
    }

    /// [`try_save`](Self::try_save) for UI callers: returns `false` on
    /// failure and publishes a categorized notice instead of an error.
    ///
    /// The caller's in-memory snapshot is left as is either way.
    pub fn save(
        &mut self,
        snapshot: &Snapshot,
        label: &str,
        saved_at: DateTime<Utc>,
        sink: &dyn StatusSink,
    ) -> bool {
        match self.try_save(snapshot, label, saved_at) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(label, error = %e, "snapshot not saved");
                sink.publish(failure_notice(&e));
                false
            }
        }
    }

    // History

    pub fn backups(&self) -> Vec<Envelope> {
        self.ring.entries(&self.kv)
    }

    pub fn backup_summaries(&self) -> Vec<BackupSummary> {
        self.ring.summaries(&self.kv)
    }

    pub fn latest_backup(&self) -> Option<Envelope> {
        self.ring.latest(&self.kv)
    }

    pub fn push_backup(&mut self, envelope: Envelope) -> Result<()> {
        self.ring.push(&mut self.kv, envelope)
    }

    /// Snapshot stored in ring entry `index`.
    pub fn restore(&self, index: usize) -> Result<Snapshot> {
        self.ring
            .restore(&self.kv, index)
            .ok_or(Error::BackupNotFound(index))
    }

    /// Reset history to a single restore point.
    pub fn clear_history(&mut self, envelope: Envelope) -> Result<()> {
        self.ring.clear_to_snapshot(&mut self.kv, envelope)
    }
}

/// Map a storage error onto the notice shown to the user.
pub fn failure_notice(err: &Error) -> Status {
    if err.is_quota_exceeded() {
        Status::QuotaExceeded
    } else {
        Status::WriteFailed {
            reason: err.to_string(),
        }
    }
}

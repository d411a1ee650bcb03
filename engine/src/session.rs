//! The application session: owner of the snapshot.
//!
//! A [`Session`] is the single writer. Mutation handlers change the snapshot
//! through it, and every change is saved locally before a remote push is
//! scheduled. Nothing here waits on the network after [`Session::boot`].

use crate::backup::BackupSummary;
use crate::clock::{Clock, SystemClock};
use crate::config::MirrorConfig;
use crate::envelope::{export, labels, parse_document};
use crate::kv::KeyValueStore;
use crate::local::{failure_notice, LocalStore};
use crate::mirror::{MirrorState, RemoteDocumentStore, RemoteMirror, DEBOUNCE};
use crate::status::{NullSink, Status, StatusSink};
use crate::{error::Result, Envelope, Snapshot};
use std::sync::Arc;
use std::time::Duration;

/// How a session is wired up.
#[derive(Clone)]
pub struct SessionOptions {
    /// Remote settings; an invalid configuration means local only
    pub mirror: MirrorConfig,
    pub clock: Arc<dyn Clock>,
    pub sink: Arc<dyn StatusSink>,
    pub debounce: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mirror: MirrorConfig::default(),
            clock: Arc::new(SystemClock),
            sink: Arc::new(NullSink),
            debounce: DEBOUNCE,
        }
    }
}

impl SessionOptions {
    pub fn with_mirror(mut self, mirror: MirrorConfig) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("mirror", &self.mirror)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

/// Owned application state plus its local and remote homes.
pub struct Session<K, R> {
    snapshot: Snapshot,
    local: LocalStore<K>,
    mirror: RemoteMirror<R>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn StatusSink>,
}

impl<K: KeyValueStore, R: RemoteDocumentStore> Session<K, R> {
    /// Load local state, then reconcile with the remote.
    ///
    /// When the remote holds a document it wins: it replaces the loaded
    /// snapshot and is saved locally as `cloud_pull` before this returns.
    pub async fn boot(kv: K, remote: R, options: SessionOptions) -> Self {
        let SessionOptions {
            mirror,
            clock,
            sink,
            debounce,
        } = options;

        let mut local = LocalStore::new(kv);
        let mut snapshot = local.load();
        tracing::info!(records = snapshot.record_count(), "loaded local snapshot");

        let mut mirror = RemoteMirror::new(mirror, remote, Arc::clone(&sink)).with_debounce(debounce);
        if let Some(pulled) = mirror.reconcile_on_start(&snapshot, clock.now()).await {
            snapshot = pulled;
            local.save(&snapshot, labels::CLOUD_PULL, clock.now(), sink.as_ref());
        }

        Self {
            snapshot,
            local,
            mirror,
            clock,
            sink,
        }
    }

    /// Current state.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Apply `mutate` and save under `label`.
    ///
    /// Returns whether the local write succeeded. The mutation stays applied
    /// in memory either way.
    pub fn mutate_and_save<F>(&mut self, label: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Snapshot),
    {
        mutate(&mut self.snapshot);
        self.save(label)
    }

    /// Save the current state locally and schedule a push.
    ///
    /// The push is scheduled even when the local write fails, so the remote
    /// still converges on what the user sees.
    pub fn save(&mut self, label: &str) -> bool {
        let now = self.clock.now();
        let saved = self
            .local
            .save(&self.snapshot, label, now, self.sink.as_ref());
        if saved {
            self.sink.publish(Status::Saved {
                label: label.to_string(),
            });
        }
        self.mirror.schedule_push(&self.snapshot, label, now);
        saved
    }

    /// Replace the snapshot with an imported document (bare snapshot or
    /// envelope).
    ///
    /// Invalid input leaves the session untouched and fails with
    /// [`Error::InvalidFormat`](crate::Error::InvalidFormat).
    pub fn import_document(&mut self, text: &str) -> Result<()> {
        let snapshot = match parse_document(text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "rejected import");
                self.sink.publish(Status::InvalidImport);
                return Err(e);
            }
        };

        tracing::info!(records = snapshot.record_count(), "importing snapshot");
        self.snapshot = snapshot;
        if self.save(labels::IMPORT) {
            self.sink.publish(Status::Imported);
        }
        Ok(())
    }

    /// Pretty JSON envelope of the current state, for download.
    pub fn export_document(&self) -> Result<String> {
        export(&self.snapshot, self.clock.now())
    }

    /// Reset to an empty snapshot.
    pub fn wipe(&mut self) -> bool {
        self.snapshot = Snapshot::default();
        let saved = self.save(labels::WIPE);
        if saved {
            self.sink.publish(Status::Wiped);
        }
        saved
    }

    /// Replace the snapshot with history entry `index`.
    pub fn restore_backup(&mut self, index: usize) -> Result<()> {
        let snapshot = self.local.restore(index)?;
        self.snapshot = snapshot;
        if self.save(labels::RESTORE) {
            self.sink.publish(Status::Restored { index });
        }
        Ok(())
    }

    /// Collapse history into a single restore point holding the current
    /// state.
    pub fn clear_history(&mut self) -> Result<()> {
        let envelope = Envelope::new(
            self.snapshot.clone(),
            labels::HISTORY_CLEARED,
            self.clock.now(),
        );
        if let Err(e) = self.local.clear_history(envelope) {
            self.sink.publish(failure_notice(&e));
            return Err(e);
        }
        self.sink.publish(Status::HistoryCleared);
        Ok(())
    }

    /// History, newest first.
    pub fn backups(&self) -> Vec<BackupSummary> {
        self.local.backup_summaries()
    }

    pub fn backup_entries(&self) -> Vec<Envelope> {
        self.local.backups()
    }

    pub fn mirror_state(&self) -> MirrorState {
        self.mirror.state()
    }

    pub fn local(&self) -> &LocalStore<K> {
        &self.local
    }

    /// Tear down, returning the host storage. A push still waiting for its
    /// timer is dropped.
    pub fn into_storage(self) -> K {
        self.local.into_inner()
    }
}

impl<K, R> std::fmt::Debug for Session<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("records", &self.snapshot.record_count())
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}

//! Optional best-effort mirror of the snapshot to a remote document.
//!
//! The mirror pulls once at startup and afterwards only pushes. Pushes are
//! debounced and coalesced by a [`PushScheduler`] owned by a background task;
//! the session hands jobs over through an unbounded channel and never waits
//! on the network. Pushes go out one at a time, so the remote ends on the
//! newest scheduled state.
//!
//! Failures are reported through the [`StatusSink`] and never retried.

pub mod debounce;
pub mod http;
pub mod remote;

pub use debounce::{Phase, PushJob, PushScheduler, DEBOUNCE};
pub use http::HttpRemote;
pub use remote::{merge_fields, MemoryRemote, Offline, RemoteDocumentStore, RemoteError};

use crate::config::MirrorConfig;
use crate::envelope::{labels, snapshot_from_document};
use crate::status::{Status, StatusSink, SyncStatus};
use crate::{Envelope, Snapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

/// Lifecycle of the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorState {
    /// No usable configuration. Terminal for the session.
    Disabled,
    /// Configured, initial pull pending or failed
    Connecting,
    /// Pushes are being scheduled
    Active,
}

/// Remote half of the session.
pub struct RemoteMirror<R> {
    state: MirrorState,
    remote: Arc<R>,
    writer: String,
    delay: Duration,
    sink: Arc<dyn StatusSink>,
    jobs: Option<mpsc::UnboundedSender<PushJob>>,
}

impl<R: RemoteDocumentStore> RemoteMirror<R> {
    /// Check `config` and set the initial state. No network call is made.
    pub fn new(config: MirrorConfig, remote: R, sink: Arc<dyn StatusSink>) -> Self {
        let (state, writer) = match config.validate() {
            Ok(config) => {
                tracing::info!(
                    collection = %config.collection,
                    document = %config.document,
                    "remote mirror configured"
                );
                sink.publish(Status::Sync(SyncStatus::Connecting));
                (MirrorState::Connecting, config.writer)
            }
            Err(issue) => {
                tracing::info!(%issue, "remote mirror disabled, running local only");
                sink.publish(Status::Sync(SyncStatus::Disabled));
                (MirrorState::Disabled, String::new())
            }
        };

        Self {
            state,
            remote: Arc::new(remote),
            writer,
            delay: DEBOUNCE,
            sink,
            jobs: None,
        }
    }

    /// Override the push debounce window.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn state(&self) -> MirrorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == MirrorState::Active
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Pull-on-start reconciliation.
    ///
    /// Returns the remote snapshot when one exists; the caller replaces its
    /// local state with it. When the remote is empty the local snapshot is
    /// written there instead. A failed read leaves the mirror `Connecting`
    /// for the rest of the session, so later pushes are skipped.
    pub async fn reconcile_on_start(
        &mut self,
        local: &Snapshot,
        now: DateTime<Utc>,
    ) -> Option<Snapshot> {
        if self.state != MirrorState::Connecting {
            return None;
        }

        let document = match self.remote.read().await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(error = %e, "initial remote pull failed");
                self.sink
                    .publish(Status::Sync(SyncStatus::Error(e.to_string())));
                return None;
            }
        };

        let pulled = document.and_then(|doc| match snapshot_from_document(&doc) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "remote document unusable, overwriting it");
                None
            }
        });

        match pulled {
            Some(snapshot) => {
                tracing::info!(records = snapshot.record_count(), "pulled remote snapshot");
                self.sink.publish(Status::Sync(SyncStatus::Pulled));
                self.activate();
                Some(snapshot)
            }
            None => {
                let envelope = self.envelope(local.clone(), labels::CLOUD_BOOTSTRAP, now);
                match push(self.remote.as_ref(), envelope).await {
                    Ok(()) => {
                        tracing::info!("bootstrapped empty remote document");
                        self.sink.publish(Status::Sync(SyncStatus::Bootstrapped));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "remote bootstrap failed");
                        self.sink
                            .publish(Status::Sync(SyncStatus::Error(e.to_string())));
                    }
                }
                self.activate();
                None
            }
        }
    }

    /// Queue `snapshot` for a debounced push. A no-op unless active.
    pub fn schedule_push(&self, snapshot: &Snapshot, label: &str, at: DateTime<Utc>) {
        let Some(jobs) = self.jobs.as_ref().filter(|_| self.is_active()) else {
            return;
        };
        let job = PushJob {
            envelope: self.envelope(snapshot.clone(), label, at),
        };
        if jobs.send(job).is_err() {
            tracing::warn!(label, "push task is gone, dropping push");
        }
    }

    fn envelope(&self, snapshot: Snapshot, label: &str, at: DateTime<Utc>) -> Envelope {
        Envelope::new(snapshot, label, at).with_updated_by(self.writer.clone())
    }

    fn activate(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_pusher(
            Arc::clone(&self.remote),
            PushScheduler::new(self.delay),
            rx,
            Arc::clone(&self.sink),
        ));
        self.jobs = Some(tx);
        self.state = MirrorState::Active;
    }
}

impl<R> std::fmt::Debug for RemoteMirror<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMirror")
            .field("state", &self.state)
            .field("writer", &self.writer)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Merge-write an envelope as the remote document body.
async fn push<R: RemoteDocumentStore>(remote: &R, envelope: Envelope) -> Result<(), RemoteError> {
    let fields =
        serde_json::to_value(&envelope).map_err(|e| RemoteError::Decode(e.to_string()))?;
    remote.write_merge(fields).await
}

/// Outcome of one push, reported back to the actor.
struct PushDone {
    label: String,
    result: Result<(), RemoteError>,
}

/// Owns the scheduler. Exits when the session drops its sender; a job still
/// waiting at that point is dropped, an in-flight push finishes on its own.
async fn run_pusher<R: RemoteDocumentStore>(
    remote: Arc<R>,
    mut scheduler: PushScheduler,
    mut jobs: mpsc::UnboundedReceiver<PushJob>,
    sink: Arc<dyn StatusSink>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<PushDone>();

    loop {
        let deadline = scheduler.deadline();

        tokio::select! {
            job = jobs.recv() => match job {
                Some(job) => {
                    scheduler.schedule(job, Instant::now());
                }
                None => {
                    if let Some(job) = scheduler.pending() {
                        tracing::debug!(label = %job.envelope.label, "session closed, dropping pending push");
                    }
                    break;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                match scheduler.fire(Instant::now()) {
                    Some(job) => start_push(&remote, job, &done_tx),
                    None => tracing::trace!("push due, waiting for in-flight push"),
                }
            }
            Some(done) = done_rx.recv() => {
                let newest = scheduler.complete();
                match done.result {
                    Ok(()) => {
                        tracing::debug!(label = %done.label, newest, "pushed snapshot");
                        if newest {
                            sink.publish(Status::Sync(SyncStatus::Synced));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(label = %done.label, error = %e, "push failed");
                        sink.publish(Status::Sync(SyncStatus::Error(e.to_string())));
                    }
                }
                if let Some(job) = scheduler.fire(Instant::now()) {
                    start_push(&remote, job, &done_tx);
                }
            }
        }
    }
}

/// Run one push on its own task so the actor keeps accepting jobs.
fn start_push<R: RemoteDocumentStore>(
    remote: &Arc<R>,
    job: PushJob,
    done: &mpsc::UnboundedSender<PushDone>,
) {
    let remote = Arc::clone(remote);
    let done = done.clone();
    tokio::spawn(async move {
        let label = job.envelope.label.clone();
        let result = push(remote.as_ref(), job.envelope).await;
        let _ = done.send(PushDone { label, result });
    });
}

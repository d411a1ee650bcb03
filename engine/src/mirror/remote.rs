//! Remote document store contract.
//!
//! The mirror talks to exactly one document at a fixed address. Reads return
//! the whole document; writes merge top-level fields so anything the writer
//! does not send is left untouched remotely.

use serde_json::{Map, Value};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

/// Failure talking to the remote document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote store unavailable")]
    Unavailable,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote responded with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("could not decode remote document: {0}")]
    Decode(String),
}

/// One remote document with merge-write semantics.
pub trait RemoteDocumentStore: Send + Sync + 'static {
    /// Fetch the document. `Ok(None)` when it does not exist yet.
    fn read(&self) -> impl Future<Output = Result<Option<Value>, RemoteError>> + Send;

    /// Merge the top-level fields of `fields` into the document, creating it
    /// when absent.
    fn write_merge(&self, fields: Value) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Merge top-level fields of `patch` into `target`.
///
/// A non-object `target` is replaced by an empty object first; a non-object
/// `patch` changes nothing.
pub fn merge_fields(target: &mut Value, patch: Value) {
    let Value::Object(patch) = patch else {
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

/// A remote that is never reachable. Stands in when no remote is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl RemoteDocumentStore for Offline {
    async fn read(&self) -> Result<Option<Value>, RemoteError> {
        Err(RemoteError::Unavailable)
    }

    async fn write_merge(&self, _fields: Value) -> Result<(), RemoteError> {
        Err(RemoteError::Unavailable)
    }
}

#[derive(Debug, Default)]
struct MemoryDocument {
    document: Option<Value>,
    writes: Vec<Value>,
    reads: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-process remote document. Clones share the same document.
///
/// Records every write so callers can observe what was sent, and can be
/// switched into failure mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<MemoryDocument>>,
}

impl MemoryRemote {
    /// An empty remote: the document does not exist yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A remote already holding `document`.
    pub fn with_document(document: Value) -> Self {
        let remote = Self::new();
        remote.lock().document = Some(document);
        remote
    }

    fn lock(&self) -> MutexGuard<'_, MemoryDocument> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current document contents.
    pub fn document(&self) -> Option<Value> {
        self.lock().document.clone()
    }

    /// Every merge payload received, oldest first.
    pub fn writes(&self) -> Vec<Value> {
        self.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }
}

impl RemoteDocumentStore for MemoryRemote {
    async fn read(&self) -> Result<Option<Value>, RemoteError> {
        let mut inner = self.lock();
        inner.reads += 1;
        if inner.fail_reads {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        Ok(inner.document.clone())
    }

    async fn write_merge(&self, fields: Value) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        inner.writes.push(fields.clone());
        merge_fields(inner.document.get_or_insert(Value::Null), fields);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_keeps_untouched_fields() {
        let mut doc = json!({"data": {"a": 1}, "owner": "studio"});
        merge_fields(&mut doc, json!({"data": {"b": 2}, "label": "edit"}));
        assert_eq!(
            doc,
            json!({"data": {"b": 2}, "owner": "studio", "label": "edit"})
        );
    }

    #[test]
    fn merge_into_non_object() {
        let mut doc = Value::Null;
        merge_fields(&mut doc, json!({"x": 1}));
        assert_eq!(doc, json!({"x": 1}));

        merge_fields(&mut doc, json!([1, 2]));
        assert_eq!(doc, json!({"x": 1}));
    }

    #[tokio::test]
    async fn memory_remote_roundtrip() {
        let remote = MemoryRemote::new();
        assert_eq!(remote.read().await.unwrap(), None);

        remote.write_merge(json!({"label": "a"})).await.unwrap();
        remote.write_merge(json!({"savedAt": "t"})).await.unwrap();

        assert_eq!(
            remote.read().await.unwrap(),
            Some(json!({"label": "a", "savedAt": "t"}))
        );
        assert_eq!(remote.write_count(), 2);
        assert_eq!(remote.read_count(), 2);
    }

    #[tokio::test]
    async fn memory_remote_failures() {
        let remote = MemoryRemote::with_document(json!({"label": "x"}));
        remote.fail_reads(true);
        remote.fail_writes(true);

        assert!(matches!(remote.read().await, Err(RemoteError::Transport(_))));
        assert!(remote.write_merge(json!({"label": "y"})).await.is_err());
        assert_eq!(remote.document(), Some(json!({"label": "x"})));
        assert_eq!(remote.write_count(), 0);
    }

    #[tokio::test]
    async fn offline_is_unavailable() {
        assert_eq!(Offline.read().await, Err(RemoteError::Unavailable));
        assert_eq!(
            Offline.write_merge(json!({})).await,
            Err(RemoteError::Unavailable)
        );
    }
}

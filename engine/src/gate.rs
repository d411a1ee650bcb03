//! Per-session "unlocked" flag.
//!
//! The credential check lives with the host; the engine only remembers that
//! it passed, in storage that is expected to be cleared when the session ends.

use crate::error::Result;
use crate::kv::KeyValueStore;

/// Storage key of the flag.
pub const SESSION_KEY: &str = "podcast_session_ok";

const OPEN: &str = "1";

/// Boolean flag kept in ephemeral storage.
#[derive(Debug, Clone, Default)]
pub struct SessionGate<K> {
    kv: K,
}

impl<K: KeyValueStore> SessionGate<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Whether the gate was opened in this session. Unreadable storage
    /// counts as closed.
    pub fn is_open(&self) -> bool {
        matches!(self.kv.get(SESSION_KEY), Ok(Some(v)) if v == OPEN)
    }

    pub fn open(&mut self) -> Result<()> {
        tracing::debug!("session gate opened");
        self.kv.set(SESSION_KEY, OPEN)
    }

    pub fn close(&mut self) -> Result<()> {
        tracing::debug!("session gate closed");
        self.kv.remove(SESSION_KEY)
    }

    pub fn into_inner(self) -> K {
        self.kv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    #[test]
    fn starts_closed() {
        assert!(!SessionGate::new(MemoryKv::new()).is_open());
    }

    #[test]
    fn open_and_close() {
        let mut gate = SessionGate::new(MemoryKv::new());
        gate.open().unwrap();
        assert!(gate.is_open());

        gate.close().unwrap();
        assert!(!gate.is_open());
        // Closing twice is fine
        gate.close().unwrap();
    }

    #[test]
    fn other_values_are_closed() {
        let mut kv = MemoryKv::new();
        kv.set(SESSION_KEY, "true").unwrap();
        assert!(!SessionGate::new(kv).is_open());
    }
}

//! Host key-value storage.
//!
//! The engine never touches files or the network directly for local data; it
//! reads and writes string values through [`KeyValueStore`]. Two backends are
//! provided: [`MemoryKv`] (ephemeral, optional quota) and [`FileKv`] (one
//! file per key, atomic replace).

use crate::{error::Result, Error};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

/// String key-value storage provided by the host.
pub trait KeyValueStore {
    /// Read a value. `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// Must report [`Error::QuotaExceeded`] when the host is out of space so
    /// callers can surface it distinctly.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory storage with an optional byte quota.
///
/// The quota counts key and value bytes across all entries, like a browser's
/// per-origin storage limit.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryKv {
    /// Unlimited storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that refuses writes once `bytes` would be exceeded.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    /// Change the quota. `None` removes it.
    pub fn set_quota(&mut self, bytes: Option<usize>) {
        self.quota = bytes;
    }

    /// Bytes currently used.
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota {
            let replaced = self.entries.get(key).map_or(0, |v| key.len() + v.len());
            let needed = self.used_bytes() - replaced + key.len() + value.len();
            if needed > quota {
                return Err(Error::QuotaExceeded { key: key.into() });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed storage: each key is `<dir>/<key>.json`.
///
/// Writes go to a temporary file that is synced and renamed over the target,
/// so a crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Open (and create if needed) a storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::StorageWrite {
            key: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    fn write_atomic(path: &Path, value: &str) -> io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    }
}

fn write_error(key: &str, err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::StorageFull => Error::QuotaExceeded { key: key.into() },
        _ => Error::StorageWrite {
            key: key.into(),
            reason: err.to_string(),
        },
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StorageRead {
                key: key.into(),
                reason: e.to_string(),
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        Self::write_atomic(&self.path_for(key), value).map_err(|e| write_error(key, e))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(write_error(key, e)),
        }
    }
}

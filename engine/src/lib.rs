//! # Podvault Engine
//!
//! Local-first persistence for a small media brand's dashboard: episodes,
//! guests and financial entries.
//!
//! The engine owns one mutable application document, writes it durably,
//! keeps a bounded rollback history next to it, and mirrors it to a remote
//! document when one is configured.
//!
//! ## Design Principles
//!
//! - **Local is authoritative**: every save hits host storage synchronously
//!   before anything else happens
//! - **Nothing fails loudly**: absent or malformed data resolves to defaults;
//!   degraded paths publish a [`Status`]
//! - **One writer**: the [`Session`] owns the snapshot; mutations take
//!   `&mut self`
//! - **Explicit time**: everything below the session takes timestamps as
//!   arguments, so tests pin them with a [`ManualClock`]
//!
//! ## Core Concepts
//!
//! ### Snapshot
//!
//! A [`Snapshot`] is the whole document: brand details plus three ordered
//! collections. [`normalize`] turns any JSON value into one, including
//! documents written by the previous dashboard version.
//!
//! ### Envelope
//!
//! Every persisted copy is wrapped in an [`Envelope`] carrying the schema
//! version, a provenance label and the write time.
//!
//! ### History
//!
//! The [`BackupRing`] keeps the last [`MAX_BACKUPS`] envelopes, newest first,
//! unique by `(savedAt, label)`.
//!
//! ### Remote mirror
//!
//! With a valid [`MirrorConfig`], the [`RemoteMirror`] pulls the remote
//! document once at boot (remote wins) and afterwards pushes debounced,
//! coalesced copies after each save.
//!
//! ## Quick Start
//!
//! ```rust
//! use podvault_engine::{Guest, GuestStatus, MemoryKv, Offline, Session, SessionOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // No remote configured: the session runs local only
//! let mut session = Session::boot(MemoryKv::new(), Offline, SessionOptions::default()).await;
//!
//! let guest = Guest::new("Ana", "Chef and author", GuestStatus::Confirmed, 0).unwrap();
//! assert!(session.mutate_and_save("guest_added", |s| s.add_guest(guest)));
//!
//! assert_eq!(session.snapshot().guests.len(), 1);
//! assert_eq!(session.backups().len(), 1);
//! # }
//! ```

pub mod backup;
pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gate;
pub mod kv;
pub mod local;
pub mod mirror;
pub mod model;
pub mod normalize;
pub mod session;
pub mod status;

// Re-export main types at crate root
pub use backup::{BackupRing, BackupSummary, MAX_BACKUPS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigIssue, MirrorConfig};
pub use envelope::{export, parse_document, Envelope, SCHEMA_VERSION};
pub use error::{Error, Result};
pub use gate::SessionGate;
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use local::LocalStore;
pub use mirror::{
    HttpRemote, MemoryRemote, MirrorState, Offline, RemoteDocumentStore, RemoteError,
    RemoteMirror,
};
pub use model::{
    Brand, Episode, EpisodeStatus, FinanceTotals, Guest, GuestStatus, MonthlyFinance, Snapshot,
    Social, Transaction, TransactionKind,
};
pub use normalize::normalize;
pub use session::{Session, SessionOptions};
pub use status::{NullSink, Status, StatusLog, StatusSink, SyncStatus};

/// Type aliases for clarity
pub type RecordId = String;
pub type Timestamp = u64;
pub type SchemaVersion = u32;

//! Error types
//!
//! Two layers of typed errors sit underneath the crate-wide `anyhow::Result`:
//!
//! - [`StoreError`]: anything the storage collaborator reports that is not a
//!   plain "not found"
//! - [`RunError`]: failures of the run itself (storage failures attributed to an
//!   operation and key, key-space consistency violations, thread startup problems)
//!
//! Workers never retry. A `RunError` raised inside a worker is logged and then
//! latches the shared error and stop flags, which shuts the whole run down.

use std::io;
use thiserror::Error;

/// Storage collaborator result type
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures reported by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection is closed")]
    Closed,

    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("cursor key not set")]
    KeyNotSet,

    #[error("cursor value not set")]
    ValueNotSet,

    #[error("cursor not positioned on a record")]
    NotPositioned,

    #[error("key not found")]
    NotFound,

    #[error("key already exists")]
    DuplicateKey,

    #[error("transaction already active")]
    TransactionActive,

    #[error("no active transaction")]
    NoTransaction,

    #[error("injected failure: {0}")]
    Injected(&'static str),

    #[error("{0} is not supported on a bulk cursor")]
    BulkCursor(&'static str),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failures of a run, as classified by the worker and phase controllers
#[derive(Debug, Error)]
pub enum RunError {
    /// A storage call failed for a specific operation and key
    #[error("{op} failed for: {key}, range: {range}")]
    Storage {
        op: &'static str,
        key: String,
        range: u64,
        #[source]
        source: StoreError,
    },

    /// An insert-with-read-modify-write found its key already present
    #[error("{op} failed for: {key}, range: {range}: key already exists")]
    KeyExists {
        op: &'static str,
        key: String,
        range: u64,
    },

    /// Session or cursor setup failed before any operation ran
    #[error("{what}: {source}")]
    Setup {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    /// A checkpoint request failed
    #[error("checkpoint failed: {source}")]
    Checkpoint {
        #[source]
        source: StoreError,
    },

    /// Scratch buffer or context allocation failed during thread startup
    #[error("failed to allocate {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: io::Error,
    },

    /// At least one thread of a phase set the shared error flag
    #[error("{phase} thread(s) exited without finishing")]
    WorkersFailed { phase: &'static str },

    /// A thread panicked instead of returning
    #[error("{role} thread panicked")]
    Panicked { role: &'static str },

    #[error("invalid operation in schedule: {0}")]
    InvalidSchedule(&'static str),
}

impl RunError {
    /// Wrap a session/cursor setup failure
    pub fn setup(what: &'static str) -> impl FnOnce(StoreError) -> RunError {
        move |source| RunError::Setup { what, source }
    }
}

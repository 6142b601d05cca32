//! Storage collaborator abstraction
//!
//! The harness drives a key/value store through a deliberately small capability
//! set: connections hand out sessions, sessions hand out cursors and run
//! transactions and checkpoints, cursors search, read, insert and update single
//! records.
//!
//! # Lifecycle
//!
//! 1. [`Backend::open`] returns a shared [`Connection`]
//! 2. Each thread opens its own [`Session`] and [`Cursor`]
//! 3. Threads close their cursor and session when they exit
//! 4. [`Connection::close`] flushes and invalidates the connection; a fresh one
//!    is obtained from the backend again
//!
//! # Thread Safety
//!
//! Connections are shared across threads (`Send + Sync`). Sessions and cursors
//! are owned by exactly one thread (`Send` only), matching how a worker owns its
//! session for its whole lifetime.
//!
//! # Example
//!
//! ```
//! use kvpulse::store::{Backend, CursorOptions, SearchResult};
//! use kvpulse::store::memory::MemoryBackend;
//!
//! let backend = MemoryBackend::new();
//! let conn = backend.open()?;
//! let mut session = conn.open_session()?;
//! session.create("table:test", "")?;
//!
//! let mut cursor = session.open_cursor("table:test", CursorOptions::default())?;
//! cursor.set_key(b"0001");
//! cursor.set_value(b"aaaa");
//! cursor.insert()?;
//!
//! cursor.set_key(b"0001");
//! assert_eq!(cursor.search()?, SearchResult::Found);
//! assert_eq!(cursor.value()?, b"aaaa");
//! # Ok::<(), kvpulse::error::StoreError>(())
//! ```

pub mod memory;

use crate::error::StoreResult;
use std::sync::Arc;

/// Outcome of a successful search
///
/// "Not found" is an expected outcome for a benchmark (the key space may be
/// sparse, or a concurrent insert may not be visible yet), so it is a value
/// rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    Found,
    NotFound,
}

/// Cursor open options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorOptions {
    /// Bulk-load cursor: insert only, searches and updates are rejected
    pub bulk: bool,
    /// Insert replaces an existing record instead of failing
    pub overwrite: bool,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self {
            bulk: false,
            overwrite: true,
        }
    }
}

impl CursorOptions {
    /// Options for a bulk-load cursor
    pub fn bulk() -> Self {
        Self {
            bulk: true,
            ..Self::default()
        }
    }
}

/// Factory for connections, able to reopen after a close
pub trait Backend: Send + Sync {
    /// Open a new connection
    fn open(&self) -> StoreResult<Arc<dyn Connection>>;
}

/// Open connection to a store, shared by all threads
pub trait Connection: Send + Sync {
    /// Open a session for the calling thread
    fn open_session(&self) -> StoreResult<Box<dyn Session>>;

    /// Close the connection; sessions opened later fail
    fn close(&self) -> StoreResult<()>;
}

/// Per-thread session
pub trait Session: Send {
    /// Create a table if it does not already exist
    fn create(&mut self, uri: &str, config: &str) -> StoreResult<()>;

    /// Open a cursor on a table
    fn open_cursor(&mut self, uri: &str, options: CursorOptions) -> StoreResult<Box<dyn Cursor>>;

    /// Start a transaction; writes through this session's cursors are buffered
    fn begin_transaction(&mut self, config: &str) -> StoreResult<()>;

    /// Commit the active transaction
    fn commit_transaction(&mut self) -> StoreResult<()>;

    /// Write a checkpoint of all tables
    fn checkpoint(&mut self) -> StoreResult<()>;

    /// Close the session
    fn close(&mut self) -> StoreResult<()>;
}

/// Cursor over a single table
pub trait Cursor: Send {
    /// Set the key for the next search/insert/update
    fn set_key(&mut self, key: &[u8]);

    /// Set the value for the next insert/update
    fn set_value(&mut self, value: &[u8]);

    /// Look up the current key
    fn search(&mut self) -> StoreResult<SearchResult>;

    /// Value of the record the cursor is positioned on
    fn value(&self) -> StoreResult<&[u8]>;

    /// Key of the record the cursor is positioned on
    fn key(&self) -> StoreResult<&[u8]>;

    /// Insert the current key/value
    fn insert(&mut self) -> StoreResult<()>;

    /// Replace the value of an existing record
    fn update(&mut self) -> StoreResult<()>;

    /// Position on the last record in key order
    fn last(&mut self) -> StoreResult<SearchResult>;

    /// Close the cursor
    fn close(&mut self) -> StoreResult<()>;
}

//! In-process key/value store
//!
//! An ordered, thread-safe store implementing the storage collaborator traits.
//! It gives the harness a real backend to drive (the populate and workload
//! phases, checkpoints and reopen all exercise it) and doubles as the test
//! backend through its [`FaultInjector`].
//!
//! # Features
//!
//! - One `BTreeMap` per table behind a `RwLock`
//! - Per-session transactions buffering writes until commit
//! - Checkpoints snapshot every table; with a home directory the snapshot is
//!   written to disk with `bincode` and reloaded by the next [`Backend::open`]
//! - Configurable failure injection for searches, checkpoints and commits
//!
//! # Example
//!
//! ```
//! use kvpulse::store::Backend;
//! use kvpulse::store::memory::MemoryBackend;
//!
//! let backend = MemoryBackend::new();
//! backend.faults().fail_searches_after(10);
//! let conn = backend.open()?;
//! # Ok::<(), kvpulse::error::StoreError>(())
//! ```

use super::{Backend, Connection, Cursor, CursorOptions, SearchResult, Session};
use crate::error::{StoreError, StoreResult};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Snapshot file name inside the home directory
pub const CHECKPOINT_FILE: &str = "kvpulse.checkpoint";

type Table = BTreeMap<Vec<u8>, Vec<u8>>;
type SharedTable = Arc<RwLock<Table>>;
type Transaction = Arc<Mutex<Option<Vec<PendingWrite>>>>;

/// Failure injection for tests
///
/// All switches are atomics so a test can flip them while worker threads run.
#[derive(Debug)]
pub struct FaultInjector {
    /// Searches allowed before every further search fails (`u64::MAX` = never)
    searches_left: AtomicU64,
    fail_checkpoints: AtomicBool,
    fail_commits: AtomicBool,
}

impl FaultInjector {
    fn new() -> Self {
        Self {
            searches_left: AtomicU64::new(u64::MAX),
            fail_checkpoints: AtomicBool::new(false),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Let `n` more searches succeed, then fail every search
    pub fn fail_searches_after(&self, n: u64) {
        self.searches_left.store(n, Ordering::SeqCst);
    }

    /// Make checkpoints fail
    pub fn set_fail_checkpoints(&self, fail: bool) {
        self.fail_checkpoints.store(fail, Ordering::SeqCst);
    }

    /// Make transaction commits fail
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn check_search(&self) -> StoreResult<()> {
        let result = self.searches_left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            match n {
                u64::MAX | 0 => None,
                n => Some(n - 1),
            }
        });
        match result {
            Err(0) => Err(StoreError::Injected("search")),
            _ => Ok(()),
        }
    }

    fn check_checkpoint(&self) -> StoreResult<()> {
        if self.fail_checkpoints.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("checkpoint"));
        }
        Ok(())
    }

    fn check_commit(&self) -> StoreResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Injected("commit"));
        }
        Ok(())
    }
}

/// All tables of one database instance
#[derive(Default)]
struct Database {
    tables: RwLock<HashMap<String, SharedTable>>,
}

impl Database {
    fn load(path: &Path) -> StoreResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let tables: HashMap<String, Table> = bincode::deserialize_from(reader)?;
        let tables = tables
            .into_iter()
            .map(|(uri, table)| (uri, Arc::new(RwLock::new(table))))
            .collect();
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    fn create(&self, uri: &str) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.entry(uri.to_string()).or_default();
    }

    fn table(&self, uri: &str) -> StoreResult<SharedTable> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(uri)
            .cloned()
            .ok_or_else(|| StoreError::NoSuchTable(uri.to_string()))
    }

    /// Consistent per-table copy of the data
    fn snapshot(&self) -> HashMap<String, Table> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .iter()
            .map(|(uri, table)| {
                let table = table.read().unwrap_or_else(PoisonError::into_inner);
                (uri.clone(), table.clone())
            })
            .collect()
    }

    /// Snapshot and, with a home directory, persist atomically
    fn persist(&self, home: Option<&Path>) -> StoreResult<()> {
        let snapshot = self.snapshot();
        let Some(home) = home else {
            return Ok(());
        };

        fs::create_dir_all(home)?;
        let path = home.join(CHECKPOINT_FILE);
        let tmp = home.join(format!("{}.tmp", CHECKPOINT_FILE));
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            bincode::serialize_into(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Factory for in-process connections
pub struct MemoryBackend {
    home: Option<PathBuf>,
    resident: Arc<Database>,
    faults: Arc<FaultInjector>,
}

impl MemoryBackend {
    /// Purely in-memory backend; data survives close/reopen in memory
    pub fn new() -> Self {
        Self {
            home: None,
            resident: Arc::new(Database::default()),
            faults: Arc::new(FaultInjector::new()),
        }
    }

    /// Backend persisting checkpoints under `home`
    ///
    /// Each open reloads the last checkpoint written there, so a reopened
    /// connection only sees data that was checkpointed or flushed by close.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            ..Self::new()
        }
    }

    /// Failure injection switches shared by every connection of this backend
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn open(&self) -> StoreResult<Arc<dyn Connection>> {
        let db = match self.home {
            Some(ref home) => {
                let path = home.join(CHECKPOINT_FILE);
                if path.exists() {
                    Arc::new(Database::load(&path)?)
                } else {
                    Arc::new(Database::default())
                }
            }
            None => Arc::clone(&self.resident),
        };

        Ok(Arc::new(MemoryConnection {
            db,
            home: self.home.clone(),
            faults: Arc::clone(&self.faults),
            closed: AtomicBool::new(false),
        }))
    }
}

struct MemoryConnection {
    db: Arc<Database>,
    home: Option<PathBuf>,
    faults: Arc<FaultInjector>,
    closed: AtomicBool,
}

impl Connection for MemoryConnection {
    fn open_session(&self) -> StoreResult<Box<dyn Session>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(Box::new(MemorySession {
            db: Arc::clone(&self.db),
            home: self.home.clone(),
            faults: Arc::clone(&self.faults),
            txn: Arc::new(Mutex::new(None)),
            closed: false,
        }))
    }

    fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        self.db.persist(self.home.as_deref())
    }
}

struct PendingWrite {
    table: SharedTable,
    key: Vec<u8>,
    value: Vec<u8>,
    kind: WriteKind,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Insert { overwrite: bool },
    Update,
}

struct MemorySession {
    db: Arc<Database>,
    home: Option<PathBuf>,
    faults: Arc<FaultInjector>,
    txn: Transaction,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Session for MemorySession {
    fn create(&mut self, uri: &str, _config: &str) -> StoreResult<()> {
        self.ensure_open()?;
        self.db.create(uri);
        Ok(())
    }

    fn open_cursor(&mut self, uri: &str, options: CursorOptions) -> StoreResult<Box<dyn Cursor>> {
        self.ensure_open()?;
        let table = self.db.table(uri)?;
        Ok(Box::new(MemoryCursor {
            table,
            options,
            txn: Arc::clone(&self.txn),
            faults: Arc::clone(&self.faults),
            key: None,
            value: None,
            current: None,
        }))
    }

    fn begin_transaction(&mut self, _config: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let mut txn = self.txn.lock().unwrap_or_else(PoisonError::into_inner);
        if txn.is_some() {
            return Err(StoreError::TransactionActive);
        }
        *txn = Some(Vec::new());
        Ok(())
    }

    fn commit_transaction(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let writes = self
            .txn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(StoreError::NoTransaction)?;

        // A failed commit aborts the transaction: nothing is applied
        self.faults.check_commit()?;
        for write in &writes {
            let table = write.table.read().unwrap_or_else(PoisonError::into_inner);
            match write.kind {
                WriteKind::Insert { overwrite: false } if table.contains_key(&write.key) => {
                    return Err(StoreError::DuplicateKey);
                }
                WriteKind::Update if !table.contains_key(&write.key) => {
                    if !writes.iter().any(|w| w.key == write.key && w.kind != WriteKind::Update) {
                        return Err(StoreError::NotFound);
                    }
                }
                _ => {}
            }
        }
        for write in writes {
            let mut table = write.table.write().unwrap_or_else(PoisonError::into_inner);
            table.insert(write.key, write.value);
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        self.faults.check_checkpoint()?;
        self.db.persist(self.home.as_deref())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        // Uncommitted work is rolled back
        self.txn.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.closed = true;
        Ok(())
    }
}

struct MemoryCursor {
    table: SharedTable,
    options: CursorOptions,
    txn: Transaction,
    faults: Arc<FaultInjector>,
    key: Option<Vec<u8>>,
    value: Option<Vec<u8>>,
    /// Record the cursor is positioned on
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl MemoryCursor {
    fn require_key(&self) -> StoreResult<&[u8]> {
        self.key.as_deref().ok_or(StoreError::KeyNotSet)
    }

    fn require_value(&self) -> StoreResult<&[u8]> {
        self.value.as_deref().ok_or(StoreError::ValueNotSet)
    }

    fn require_lookup(&self, op: &'static str) -> StoreResult<()> {
        if self.options.bulk {
            return Err(StoreError::BulkCursor(op));
        }
        Ok(())
    }

    /// Latest uncommitted value written through this session, if any
    fn pending_value(&self, key: &[u8]) -> Option<Vec<u8>> {
        let txn = self.txn.lock().unwrap_or_else(PoisonError::into_inner);
        txn.as_ref().and_then(|writes| {
            writes
                .iter()
                .rev()
                .find(|w| Arc::ptr_eq(&w.table, &self.table) && w.key == key)
                .map(|w| w.value.clone())
        })
    }

    fn exists(&self, key: &[u8]) -> bool {
        if self.pending_value(key).is_some() {
            return true;
        }
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.contains_key(key)
    }

    /// Queue a write in the active transaction; returns false when none is active
    fn buffer_write(&self, kind: WriteKind) -> StoreResult<bool> {
        let key = self.require_key()?.to_vec();
        let value = self.require_value()?.to_vec();
        let mut txn = self.txn.lock().unwrap_or_else(PoisonError::into_inner);
        match txn.as_mut() {
            Some(writes) => {
                writes.push(PendingWrite {
                    table: Arc::clone(&self.table),
                    key,
                    value,
                    kind,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Cursor for MemoryCursor {
    fn set_key(&mut self, key: &[u8]) {
        match self.key {
            Some(ref mut buf) => {
                buf.clear();
                buf.extend_from_slice(key);
            }
            None => self.key = Some(key.to_vec()),
        }
    }

    fn set_value(&mut self, value: &[u8]) {
        match self.value {
            Some(ref mut buf) => {
                buf.clear();
                buf.extend_from_slice(value);
            }
            None => self.value = Some(value.to_vec()),
        }
    }

    fn search(&mut self) -> StoreResult<SearchResult> {
        self.require_lookup("search")?;
        self.faults.check_search()?;
        let key = self.require_key()?.to_vec();

        let found = match self.pending_value(&key) {
            Some(value) => Some(value),
            None => {
                let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
                table.get(&key).cloned()
            }
        };

        match found {
            Some(value) => {
                self.current = Some((key, value));
                Ok(SearchResult::Found)
            }
            None => {
                self.current = None;
                Ok(SearchResult::NotFound)
            }
        }
    }

    fn value(&self) -> StoreResult<&[u8]> {
        self.current
            .as_ref()
            .map(|(_, value)| value.as_slice())
            .ok_or(StoreError::NotPositioned)
    }

    fn key(&self) -> StoreResult<&[u8]> {
        self.current
            .as_ref()
            .map(|(key, _)| key.as_slice())
            .ok_or(StoreError::NotPositioned)
    }

    fn insert(&mut self) -> StoreResult<()> {
        self.current = None;
        let overwrite = self.options.overwrite;
        if !overwrite && self.exists(self.require_key()?) {
            return Err(StoreError::DuplicateKey);
        }
        if self.buffer_write(WriteKind::Insert { overwrite })? {
            return Ok(());
        }

        let key = self.require_key()?.to_vec();
        let value = self.require_value()?.to_vec();
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if !overwrite && table.contains_key(&key) {
            return Err(StoreError::DuplicateKey);
        }
        table.insert(key, value);
        Ok(())
    }

    fn update(&mut self) -> StoreResult<()> {
        self.require_lookup("update")?;
        self.current = None;
        if !self.exists(self.require_key()?) {
            return Err(StoreError::NotFound);
        }
        if self.buffer_write(WriteKind::Update)? {
            return Ok(());
        }

        let key = self.require_key()?;
        let value = self.require_value()?;
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        match table.get_mut(key) {
            Some(existing) => {
                existing.clear();
                existing.extend_from_slice(value);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn last(&mut self) -> StoreResult<SearchResult> {
        self.require_lookup("last")?;
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        match table.iter().next_back() {
            Some((key, value)) => {
                self.current = Some((key.clone(), value.clone()));
                Ok(SearchResult::Found)
            }
            None => {
                self.current = None;
                Ok(SearchResult::NotFound)
            }
        }
    }

    fn close(&mut self) -> StoreResult<()> {
        self.current = None;
        self.key = None;
        self.value = None;
        Ok(())
    }
}

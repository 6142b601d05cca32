//! Worker threads
//!
//! A worker walks its [`Schedule`] cyclically. Each iteration picks a key,
//! runs one operation through its own session and cursor, classifies the
//! outcome and counts it against the matching latency track.
//!
//! # Key selection
//!
//! - Inserts take the next number from the shared insert counter, offset by
//!   `icount`, unless a random range is configured.
//! - Reads and updates (and inserts with a random range) draw from the
//!   configured [`Distribution`] over the current value range.
//!
//! # Outcomes
//!
//! | Operation  | Found            | Not found           | Error |
//! |------------|------------------|---------------------|-------|
//! | read       | read             | read                | fatal |
//! | insert_rmw | fatal (key used) | insert              | fatal |
//! | update     | toggle + update  | read                | fatal |
//!
//! Any fatal outcome ends the worker with a [`RunError`]; the thread wrapper
//! logs it and latches the run's error and stop flags.
//!
//! # Latency aggregation
//!
//! Calls are timed in bursts by a [`BurstTimer`]. A burst ends when
//! `latency_aggregate` calls completed or when the next scheduled operation
//! differs from the one just run, so one burst never mixes kinds.
//!
//! With `run_ops` set every operation is reserved from the run's budget first;
//! the worker that finds the budget spent stops the run.

pub mod schedule;
pub mod threads;

use crate::config::Config;
use crate::coordinator::state::RunState;
use crate::distribution::{self, Distribution};
use crate::error::RunError;
use crate::stats::{ThreadRole, ThreadStats, TrackKind};
use crate::store::{Connection, Cursor, CursorOptions, SearchResult, Session};
use crate::util::buffer::{KeyBuffer, ValueBuffer};
use crate::util::fast_time::FastInstant;
use schedule::{OperationKind, Schedule};
use std::sync::Arc;
use std::thread;

/// Handles shared by every thread of a run
#[derive(Clone)]
pub struct Shared {
    pub config: Arc<Config>,
    pub state: Arc<RunState>,
    pub conn: Arc<dyn Connection>,
}

/// Everything one thread owns
///
/// Built by the thread lifecycle manager before the thread is spawned and
/// dropped when the thread exits. The stats outlive it in the registry.
pub struct WorkerContext {
    pub id: usize,
    pub role: ThreadRole,
    pub schedule: Schedule,
    pub stats: Arc<ThreadStats>,
    pub key: KeyBuffer,
    pub value: ValueBuffer,
    pub distribution: Box<dyn Distribution>,
    pub config: Arc<Config>,
    pub state: Arc<RunState>,
    pub conn: Arc<dyn Connection>,
}

impl WorkerContext {
    /// Allocate the buffers and tracking data of a new thread
    ///
    /// Run-mix workers copy `run_mix`; every other thread gets a uniform
    /// schedule for its role.
    pub fn new(
        id: usize,
        role: ThreadRole,
        shared: &Shared,
        run_mix: Option<&Schedule>,
    ) -> Result<Self, RunError> {
        let config = &shared.config;
        let key = KeyBuffer::new(config.workload.key_sz)?;
        let value = ValueBuffer::new(config.workload.data_sz)?;

        let schedule = match (role, run_mix) {
            (ThreadRole::Read | ThreadRole::Insert | ThreadRole::Update, Some(template)) => {
                template.clone()
            }
            (ThreadRole::Read, None) => Schedule::uniform(OperationKind::Read),
            (ThreadRole::Insert, None) if config.workload.insert_rmw => {
                Schedule::uniform(OperationKind::InsertRmw)
            }
            (ThreadRole::Insert | ThreadRole::Populate, _) => {
                Schedule::uniform(OperationKind::Insert)
            }
            (ThreadRole::Update, None) => Schedule::uniform(OperationKind::Update),
            (ThreadRole::Checkpoint, _) => Schedule::uniform(OperationKind::Checkpoint),
        };

        Ok(Self {
            id,
            role,
            schedule,
            stats: shared.state.registry.register(role),
            key,
            value,
            distribution: distribution::from_config(config),
            config: Arc::clone(config),
            state: Arc::clone(&shared.state),
            conn: Arc::clone(&shared.conn),
        })
    }

    /// Open this thread's session
    pub fn open_session(&self, what: &'static str) -> Result<Box<dyn Session>, RunError> {
        self.conn.open_session().map_err(RunError::setup(what))
    }

    /// Key number for the next operation, 0 when nothing is readable yet
    fn next_key(&mut self, op: OperationKind, range: u64) -> u64 {
        if op.is_insert() && self.config.workload.random_range == 0 {
            self.config.populate.icount + self.state.next_insert_key()
        } else {
            self.distribution.next_key(range)
        }
    }
}

/// Times bursts of calls for aggregated latency
#[derive(Debug)]
pub struct BurstTimer {
    start: FastInstant,
    calls: u64,
    limit: u64,
}

impl BurstTimer {
    /// Timer flushing at most every `limit` calls
    pub fn new(limit: u32) -> Self {
        Self {
            start: FastInstant::now(),
            calls: 0,
            limit: limit.max(1) as u64,
        }
    }

    /// Count a completed call; true when the aggregation limit is reached
    #[inline]
    pub fn complete(&mut self) -> bool {
        self.calls += 1;
        self.calls >= self.limit
    }

    /// Fold the burst into `stats` and start a new one
    pub fn flush(&mut self, stats: &ThreadStats) {
        let now = FastInstant::now();
        stats.flush(now.nanos_since(self.start), self.calls);
        self.start = now;
        self.calls = 0;
    }
}

/// Entry point of read, insert and update threads
pub fn worker_thread(ctx: &mut WorkerContext) -> Result<(), RunError> {
    let mut session = ctx.open_session("worker: open_session")?;
    let result = run_schedule(ctx, session.as_mut());
    let closed = session.close().map_err(RunError::setup("worker: session close"));
    result.and(closed)
}

fn run_schedule(ctx: &mut WorkerContext, session: &mut dyn Session) -> Result<(), RunError> {
    let uri = ctx.config.uri();
    let mut cursor = session
        .open_cursor(&uri, CursorOptions::default())
        .map_err(RunError::setup("worker: open_cursor"))?;

    let run_ops = ctx.config.workload.run_ops;
    let mut timer = BurstTimer::new(ctx.config.output.latency_aggregate);
    let mut slot = 0;
    let result = loop {
        if ctx.state.is_stopped() {
            break Ok(());
        }

        let op = ctx.schedule.get(slot);
        let range = distribution::value_range(&ctx.config, ctx.state.insert_key());
        let keyno = ctx.next_key(op, range);
        if keyno == 0 {
            // Nothing inserted yet: retry the same slot
            thread::yield_now();
            continue;
        }

        if run_ops != 0 && !ctx.state.claim_op(run_ops) {
            ctx.state.request_stop();
            break Ok(());
        }

        ctx.key.format(keyno);
        let track = match execute(op, cursor.as_mut(), &ctx.key, &mut ctx.value, range) {
            Ok(track) => track,
            Err(err) => break Err(err),
        };
        ctx.stats.track(track).complete_op();

        slot = (slot + 1) % schedule::SCHEDULE_SLOTS;
        if timer.complete() || ctx.schedule.get(slot) != op {
            timer.flush(&ctx.stats);
        }
    };

    timer.flush(&ctx.stats);
    let closed = cursor.close().map_err(RunError::setup("worker: cursor close"));
    result.and(closed)
}

/// Run one operation on the key already formatted into `key`
///
/// Returns the track the call counts against.
fn execute(
    op: OperationKind,
    cursor: &mut dyn Cursor,
    key: &KeyBuffer,
    value: &mut ValueBuffer,
    range: u64,
) -> Result<TrackKind, RunError> {
    let failed = |source| RunError::Storage {
        op: op.name(),
        key: key.as_str().to_string(),
        range,
        source,
    };

    cursor.set_key(key.as_bytes());
    match op {
        OperationKind::Read => {
            // Not found is a read too: the range may be sparse, or an insert
            // may have claimed the key without finishing yet
            cursor.search().map_err(failed)?;
            Ok(op.track())
        }
        OperationKind::InsertRmw | OperationKind::Insert => {
            if op == OperationKind::InsertRmw {
                match cursor.search().map_err(failed)? {
                    SearchResult::NotFound => cursor.set_key(key.as_bytes()),
                    SearchResult::Found => {
                        return Err(RunError::KeyExists {
                            op: op.name(),
                            key: key.as_str().to_string(),
                            range,
                        })
                    }
                }
            }
            cursor.set_value(value.as_slice());
            cursor.insert().map_err(failed)?;
            Ok(op.track())
        }
        OperationKind::Update => match cursor.search().map_err(failed)? {
            SearchResult::Found => {
                value.load(cursor.value().map_err(failed)?);
                value.toggle_marker();
                cursor.set_value(value.as_slice());
                cursor.update().map_err(failed)?;
                Ok(op.track())
            }
            SearchResult::NotFound => Ok(TrackKind::Read),
        },
        OperationKind::Checkpoint => Err(RunError::InvalidSchedule(
            "checkpoint scheduled on a worker thread",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryBackend;
    use crate::store::Backend;
    use crate::util::buffer::{VALUE_FILL, VALUE_MARKER};

    fn setup(config: Config) -> (MemoryBackend, Shared) {
        let backend = MemoryBackend::new();
        let conn = backend.open().unwrap();
        let mut session = conn.open_session().unwrap();
        session.create(&config.uri(), "").unwrap();
        let shared = Shared {
            config: Arc::new(config),
            state: Arc::new(RunState::new()),
            conn,
        };
        (backend, shared)
    }

    fn small_config() -> Config {
        let mut config = Config::default();
        config.populate.icount = 0;
        config.workload.key_sz = 6;
        config.workload.data_sz = 4;
        config
    }

    fn open_cursor(shared: &Shared) -> (Box<dyn Session>, Box<dyn Cursor>) {
        let mut session = shared.conn.open_session().unwrap();
        let cursor = session
            .open_cursor(&shared.config.uri(), CursorOptions::default())
            .unwrap();
        (session, cursor)
    }

    #[test]
    fn test_context_schedules() {
        let mut config = small_config();
        config.workload.insert_rmw = true;
        let (_backend, shared) = setup(config);

        let reader = WorkerContext::new(0, ThreadRole::Read, &shared, None).unwrap();
        assert_eq!(reader.schedule, Schedule::uniform(OperationKind::Read));

        let inserter = WorkerContext::new(1, ThreadRole::Insert, &shared, None).unwrap();
        assert_eq!(inserter.schedule, Schedule::uniform(OperationKind::InsertRmw));

        let template = Schedule::run_mix(20, 30, false).unwrap();
        let mixed = WorkerContext::new(2, ThreadRole::Update, &shared, Some(&template)).unwrap();
        assert_eq!(mixed.schedule, template);

        assert_eq!(shared.state.registry.len(), 3);
    }

    #[test]
    fn test_context_allocation_failure() {
        let mut config = small_config();
        config.workload.data_sz = usize::MAX;
        let (_backend, shared) = setup(config);

        let result = WorkerContext::new(0, ThreadRole::Read, &shared, None);
        assert!(matches!(result, Err(RunError::Allocation { .. })));
        assert!(shared.state.registry.is_empty());
    }

    #[test]
    fn test_execute_read_not_found_counts_as_read() {
        let (_backend, shared) = setup(small_config());
        let (_session, mut cursor) = open_cursor(&shared);
        let mut key = KeyBuffer::new(6).unwrap();
        let mut value = ValueBuffer::new(4).unwrap();

        key.format(7);
        let track = execute(OperationKind::Read, cursor.as_mut(), &key, &mut value, 10).unwrap();
        assert_eq!(track, TrackKind::Read);

        let track = execute(OperationKind::Update, cursor.as_mut(), &key, &mut value, 10).unwrap();
        assert_eq!(track, TrackKind::Read);
    }

    #[test]
    fn test_execute_update_toggles_marker() {
        let (_backend, shared) = setup(small_config());
        let (_session, mut cursor) = open_cursor(&shared);
        let mut key = KeyBuffer::new(6).unwrap();
        let mut value = ValueBuffer::new(4).unwrap();

        key.format(1);
        execute(OperationKind::Insert, cursor.as_mut(), &key, &mut value, 0).unwrap();

        let track = execute(OperationKind::Update, cursor.as_mut(), &key, &mut value, 1).unwrap();
        assert_eq!(track, TrackKind::Update);
        cursor.set_key(b"000001");
        cursor.search().unwrap();
        assert_eq!(cursor.value().unwrap()[0], VALUE_MARKER);

        execute(OperationKind::Update, cursor.as_mut(), &key, &mut value, 1).unwrap();
        cursor.set_key(b"000001");
        cursor.search().unwrap();
        assert_eq!(cursor.value().unwrap()[0], VALUE_FILL);
    }

    #[test]
    fn test_execute_insert_rmw_requires_free_key() {
        let (_backend, shared) = setup(small_config());
        let (_session, mut cursor) = open_cursor(&shared);
        let mut key = KeyBuffer::new(6).unwrap();
        let mut value = ValueBuffer::new(4).unwrap();

        key.format(3);
        let track = execute(OperationKind::InsertRmw, cursor.as_mut(), &key, &mut value, 0).unwrap();
        assert_eq!(track, TrackKind::Insert);

        let err = execute(OperationKind::InsertRmw, cursor.as_mut(), &key, &mut value, 5).unwrap_err();
        assert!(matches!(err, RunError::KeyExists { op: "insert_rmw", .. }));
        assert!(err.to_string().contains("000003"));
    }

    #[test]
    fn test_execute_storage_error_names_key_and_range() {
        let (backend, shared) = setup(small_config());
        let (_session, mut cursor) = open_cursor(&shared);
        let mut key = KeyBuffer::new(6).unwrap();
        let mut value = ValueBuffer::new(4).unwrap();

        backend.faults().fail_searches_after(0);
        key.format(42);
        let err = execute(OperationKind::Read, cursor.as_mut(), &key, &mut value, 99).unwrap_err();
        assert_eq!(err.to_string(), "read failed for: 000042, range: 99");
    }

    #[test]
    fn test_burst_timer_flushes_at_limit() {
        let stats = ThreadStats::new(ThreadRole::Read);
        let mut timer = BurstTimer::new(3);

        for i in 1..=3 {
            stats.read.complete_op();
            assert_eq!(timer.complete(), i == 3);
        }
        timer.flush(&stats);
        assert_eq!(stats.read.pending(), 0);
        assert_eq!(stats.read.histogram().snapshot().total(), 3);
    }

    #[test]
    fn test_worker_inserts_sequential_keys_until_stopped() {
        let mut config = small_config();
        config.populate.icount = 100;
        let (_backend, shared) = setup(config);

        let mut ctx = WorkerContext::new(0, ThreadRole::Insert, &shared, None).unwrap();
        let state = Arc::clone(&shared.state);
        let handle = thread::spawn(move || {
            let result = worker_thread(&mut ctx);
            (result, ctx.stats.clone())
        });

        while state.insert_key() < 50 {
            thread::yield_now();
        }
        state.request_stop();
        let (result, stats) = handle.join().unwrap();
        result.unwrap();

        // Keys start right after icount
        let (_session, mut cursor) = open_cursor(&shared);
        cursor.set_key(b"000101");
        assert_eq!(cursor.search().unwrap(), SearchResult::Found);
        cursor.set_key(b"000100");
        assert_eq!(cursor.search().unwrap(), SearchResult::NotFound);

        assert_eq!(stats.insert.ops(), state.insert_key());
        assert_eq!(stats.insert.histogram().snapshot().total(), stats.insert.ops());
    }

    #[test]
    fn test_worker_fails_on_storage_error() {
        let mut config = small_config();
        config.populate.icount = 10;
        let (backend, shared) = setup(config);
        backend.faults().fail_searches_after(5);

        let mut ctx = WorkerContext::new(0, ThreadRole::Read, &shared, None).unwrap();
        let err = worker_thread(&mut ctx).unwrap_err();
        assert!(matches!(err, RunError::Storage { op: "read", range: 10, .. }));
        assert_eq!(ctx.stats.read.ops(), 5);
    }
}

//! Process-wide run state shared by every thread
//!
//! One [`RunState`] is created per run and handed to every thread as an
//! `Arc`. It carries the stop and error latches, the checkpoint-in-progress
//! toggle, the shared insert key counter, rolling totals, and the registry of
//! per-thread statistics.
//!
//! # Cancellation
//!
//! Threads that wait on an interval call [`RunState::wait`], which returns as
//! soon as a stop is requested. The wake-up uses a zero-capacity channel whose
//! only sender is dropped by [`RunState::request_stop`]; a dropped sender
//! disconnects every receiver at once.

use crate::stats::{AlignedCounter, StatsRegistry, ThreadRole, TrackKind};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Shared run state
#[derive(Debug)]
pub struct RunState {
    /// One-way latch, never cleared once set
    stop: AtomicBool,
    /// Set by the first thread that fails
    error: AtomicBool,
    checkpoint_in_progress: AtomicBool,
    insert_key: AlignedCounter,
    /// Workload operations reserved against `run_ops`
    ops_claimed: AlignedCounter,
    pub totals: Totals,
    pub registry: StatsRegistry,
    stop_tx: Mutex<Option<Sender<()>>>,
    stop_rx: Receiver<()>,
}

/// Rolling operation totals of the workload and checkpoint threads
#[derive(Debug, Default)]
pub struct Totals {
    pub insert: AlignedCounter,
    pub read: AlignedCounter,
    pub update: AlignedCounter,
    pub checkpoint: AlignedCounter,
}

impl Totals {
    pub fn get(&self, kind: TrackKind) -> u64 {
        match kind {
            TrackKind::Read => self.read.get(),
            TrackKind::Insert => self.insert.get(),
            TrackKind::Update => self.update.get(),
            TrackKind::Checkpoint => self.checkpoint.get(),
        }
    }

    /// Read, insert and update operations
    pub fn data_ops(&self) -> u64 {
        self.read.get() + self.insert.get() + self.update.get()
    }
}

impl RunState {
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = channel::bounded(0);
        Self {
            stop: AtomicBool::new(false),
            error: AtomicBool::new(false),
            checkpoint_in_progress: AtomicBool::new(false),
            insert_key: AlignedCounter::new(),
            ops_claimed: AlignedCounter::new(),
            totals: Totals::default(),
            registry: StatsRegistry::new(),
            stop_tx: Mutex::new(Some(stop_tx)),
            stop_rx,
        }
    }

    /// Ask every thread to wind down; idempotent
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.stop_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Record a failure and stop the run
    pub fn fail(&self) {
        self.error.store(true, Ordering::Release);
        self.request_stop();
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    #[inline]
    pub fn has_failed(&self) -> bool {
        self.error.load(Ordering::Acquire)
    }

    /// Sleep for `timeout` unless a stop is requested first
    ///
    /// Returns `true` when the run is stopping.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }
        match self.stop_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_stopped(),
            // Nothing is ever sent: any other outcome means the sender is gone
            _ => true,
        }
    }

    /// Re-sum the totals from every non-populate thread
    pub fn refresh_totals(&self) -> &Totals {
        let counted = |role: ThreadRole| role != ThreadRole::Populate;
        let registry = &self.registry;
        self.totals.read.set(registry.sum_ops(TrackKind::Read, counted));
        self.totals.insert.set(registry.sum_ops(TrackKind::Insert, counted));
        self.totals.update.set(registry.sum_ops(TrackKind::Update, counted));
        self.totals.checkpoint.set(registry.sum_ops(TrackKind::Checkpoint, counted));
        &self.totals
    }

    pub fn set_checkpoint_in_progress(&self, active: bool) {
        self.checkpoint_in_progress.store(active, Ordering::Release);
    }

    pub fn checkpoint_in_progress(&self) -> bool {
        self.checkpoint_in_progress.load(Ordering::Acquire)
    }

    /// Claim the next key number (first call returns 1)
    #[inline]
    pub fn next_insert_key(&self) -> u64 {
        self.insert_key.increment()
    }

    /// Number of key numbers claimed so far
    #[inline]
    pub fn insert_key(&self) -> u64 {
        self.insert_key.get()
    }

    /// Restart key numbering, used between populate and workload
    pub fn reset_insert_key(&self) {
        self.insert_key.set(0);
    }

    /// Reserve one workload operation out of `limit`
    ///
    /// Returns `false` once `limit` operations have been reserved, so the
    /// workers together never run more than `limit` operations.
    #[inline]
    pub fn claim_op(&self, limit: u64) -> bool {
        self.ops_claimed.increment() <= limit
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_stop_is_a_latch() {
        let state = RunState::new();
        assert!(!state.is_stopped());
        state.request_stop();
        state.request_stop();
        assert!(state.is_stopped());
        assert!(!state.has_failed());
    }

    #[test]
    fn test_fail_sets_both_flags() {
        let state = RunState::new();
        state.fail();
        assert!(state.has_failed());
        assert!(state.is_stopped());
    }

    #[test]
    fn test_wait_times_out() {
        let state = RunState::new();
        let start = Instant::now();
        assert!(!state.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_stop() {
        let state = Arc::new(RunState::new());
        let waiter = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let start = Instant::now();
                let stopped = state.wait(Duration::from_secs(30));
                (stopped, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        state.request_stop();
        let (stopped, elapsed) = waiter.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));

        // Already stopped: returns immediately
        assert!(state.wait(Duration::from_secs(30)));
    }

    #[test]
    fn test_insert_keys_are_unique_across_threads() {
        let state = Arc::new(RunState::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || (0..1000).map(|_| state.next_insert_key()).collect::<Vec<_>>())
            })
            .collect();

        let mut keys: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 4000);
        assert_eq!(keys[0], 1);
        assert_eq!(keys[3999], 4000);
        assert_eq!(state.insert_key(), 4000);

        state.reset_insert_key();
        assert_eq!(state.next_insert_key(), 1);
    }

    #[test]
    fn test_refresh_totals_skips_populate() {
        let state = RunState::new();
        let populate = state.registry.register(ThreadRole::Populate);
        let reader = state.registry.register(ThreadRole::Read);
        let ckpt = state.registry.register(ThreadRole::Checkpoint);

        populate.insert.complete_op();
        reader.read.complete_op();
        reader.read.complete_op();
        reader.insert.complete_op();
        ckpt.checkpoint.complete_op();

        let totals = state.refresh_totals();
        assert_eq!(totals.read.get(), 2);
        assert_eq!(totals.insert.get(), 1);
        assert_eq!(totals.get(TrackKind::Checkpoint), 1);
        assert_eq!(totals.data_ops(), 3);
    }

    #[test]
    fn test_op_budget_is_exact_across_threads() {
        let state = Arc::new(RunState::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    let mut claimed = 0;
                    while state.claim_op(500) {
                        claimed += 1;
                    }
                    claimed
                })
            })
            .collect();

        let claimed: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(claimed, 500);
        assert!(!state.claim_op(500));
    }

    #[test]
    fn test_checkpoint_toggle() {
        let state = RunState::new();
        state.set_checkpoint_in_progress(true);
        assert!(state.checkpoint_in_progress());
        state.set_checkpoint_in_progress(false);
        assert!(!state.checkpoint_in_progress());
    }
}

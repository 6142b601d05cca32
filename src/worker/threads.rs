//! Thread lifecycle management
//!
//! A [`ThreadGroup`] starts a homogeneous set of threads sharing one role and
//! one entry point, and joins them again.
//!
//! Starting stops at the first allocation or spawn failure. Threads already
//! running are not rolled back: the caller fails the run, which stops them,
//! and still joins the group. Joining drops each thread's context (buffers,
//! session handles) while its statistics stay in the registry for the monitor
//! and the final report.

use super::schedule::Schedule;
use super::{Shared, WorkerContext};
use crate::error::RunError;
use crate::stats::ThreadRole;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Thread entry point; an error fails the whole run
pub type ThreadEntry = fn(&mut WorkerContext) -> Result<(), RunError>;

/// Group of threads started with the same role and entry point
pub struct ThreadGroup {
    role: ThreadRole,
    shared: Shared,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadGroup {
    pub fn new(role: ThreadRole, shared: &Shared) -> Self {
        Self {
            role,
            shared: shared.clone(),
            handles: Vec::new(),
        }
    }

    /// Allocate contexts and spawn `count` more threads running `entry`
    pub fn start(
        &mut self,
        count: u32,
        run_mix: Option<&Schedule>,
        entry: ThreadEntry,
    ) -> Result<(), RunError> {
        for _ in 0..count {
            let id = self.handles.len();
            let ctx = WorkerContext::new(id, self.role, &self.shared, run_mix)?;

            let handle = thread::Builder::new()
                .name(format!("{}-{}", self.role, id))
                .spawn(move || run_thread(ctx, entry))
                .map_err(|source| RunError::Spawn {
                    role: self.role.name(),
                    source,
                })?;
            self.handles.push(handle);
        }

        debug!(role = %self.role, threads = self.handles.len(), "Threads started");
        Ok(())
    }

    /// Number of threads started so far
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every thread of the group
    ///
    /// A panicked thread fails the run; the remaining threads are still joined.
    pub fn join(self) -> Result<(), RunError> {
        let mut panicked = false;
        for handle in self.handles {
            if handle.join().is_err() {
                panicked = true;
                self.shared.state.fail();
            }
        }

        if panicked {
            return Err(RunError::Panicked {
                role: self.role.name(),
            });
        }
        Ok(())
    }
}

fn run_thread(mut ctx: WorkerContext, entry: ThreadEntry) {
    if let Err(err) = entry(&mut ctx) {
        error!(role = %ctx.role, id = ctx.id, "{}", err);
        ctx.state.fail();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::coordinator::state::RunState;
    use crate::store::memory::MemoryBackend;
    use crate::store::Backend;
    use std::sync::Arc;

    fn shared(config: Config) -> Shared {
        let backend = MemoryBackend::new();
        Shared {
            config: Arc::new(config),
            state: Arc::new(RunState::new()),
            conn: backend.open().unwrap(),
        }
    }

    fn count_until_stopped(ctx: &mut WorkerContext) -> Result<(), RunError> {
        while !ctx.state.is_stopped() {
            ctx.stats.read.complete_op();
            std::thread::yield_now();
        }
        Ok(())
    }

    fn fail_immediately(_ctx: &mut WorkerContext) -> Result<(), RunError> {
        Err(RunError::InvalidSchedule("test failure"))
    }

    fn panic_immediately(_ctx: &mut WorkerContext) -> Result<(), RunError> {
        panic!("thread panic in test");
    }

    #[test]
    fn test_start_and_join() {
        let shared = shared(Config::default());
        let mut group = ThreadGroup::new(ThreadRole::Read, &shared);
        group.start(4, None, count_until_stopped).unwrap();
        assert_eq!(group.len(), 4);

        shared.state.request_stop();
        group.join().unwrap();

        // Stats survive the threads
        assert_eq!(shared.state.registry.len(), 4);
        assert!(!shared.state.has_failed());
    }

    #[test]
    fn test_failing_entry_fails_run() {
        let shared = shared(Config::default());
        let mut group = ThreadGroup::new(ThreadRole::Update, &shared);
        group.start(2, None, fail_immediately).unwrap();
        group.join().unwrap();

        assert!(shared.state.has_failed());
        assert!(shared.state.is_stopped());
    }

    #[test]
    fn test_panicking_entry_is_reported() {
        let shared = shared(Config::default());
        let mut group = ThreadGroup::new(ThreadRole::Insert, &shared);
        group.start(1, None, panic_immediately).unwrap();

        let err = group.join().unwrap_err();
        assert!(matches!(err, RunError::Panicked { role: "insert" }));
        assert!(shared.state.has_failed());
    }

    #[test]
    fn test_allocation_failure_keeps_started_threads() {
        let mut config = Config::default();
        config.workload.data_sz = usize::MAX;
        let shared = shared(config);

        let mut group = ThreadGroup::new(ThreadRole::Read, &shared);
        let err = group.start(3, None, count_until_stopped).unwrap_err();
        assert!(matches!(err, RunError::Allocation { .. }));
        assert!(group.is_empty());
        group.join().unwrap();
    }
}

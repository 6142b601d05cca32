//! Checkpoint driver
//!
//! Each checkpoint thread waits `checkpoint.interval` seconds, requests one
//! checkpoint and times it, until the run stops. The shared
//! checkpoint-in-progress flag is raised around the call so the monitor can
//! report it. A failed checkpoint fails the run.

use crate::error::RunError;
use crate::store::Session;
use crate::util::fast_time::FastInstant;
use crate::worker::WorkerContext;
use std::time::Duration;
use tracing::debug;

/// Entry point of checkpoint threads
pub fn checkpoint_thread(ctx: &mut WorkerContext) -> Result<(), RunError> {
    let mut session = ctx.open_session("checkpointer: open_session")?;
    let result = checkpoint_loop(ctx, session.as_mut());
    let closed = session
        .close()
        .map_err(RunError::setup("checkpointer: session close"));
    result.and(closed)
}

fn checkpoint_loop(ctx: &mut WorkerContext, session: &mut dyn Session) -> Result<(), RunError> {
    let interval = Duration::from_secs(ctx.config.checkpoint.interval as u64);

    loop {
        if ctx.state.wait(interval) {
            return Ok(());
        }

        ctx.state.set_checkpoint_in_progress(true);
        let start = FastInstant::now();
        let result = session.checkpoint();
        let elapsed = FastInstant::now().nanos_since(start);
        ctx.state.set_checkpoint_in_progress(false);
        result.map_err(|source| RunError::Checkpoint { source })?;

        let track = &ctx.stats.checkpoint;
        track.complete_op();
        track.record_batch(elapsed, 1);
        debug!(id = ctx.id, elapsed_ns = elapsed, "Checkpoint completed");
    }
}

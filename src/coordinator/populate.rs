//! Populate phase
//!
//! Loads keys `1..=icount` in order. Populate threads claim key numbers from
//! the shared insert counter, so the load is gapless and free of duplicates no
//! matter how many threads run.
//!
//! With `ops_per_txn` set, inserts are grouped into transactions of that size.
//! A failed commit is logged and the load moves on: the batch is lost but its
//! keys stay claimed.
//!
//! When the load finishes the controller optionally sleeps (`merge_sleep`)
//! and then closes and reopens the connection, so the workload only sees
//! what the store persisted.

use crate::error::RunError;
use crate::stats::{ThreadRole, TrackKind};
use crate::store::{Backend, Connection, CursorOptions, Session};
use crate::util::time::{calculate_rate, format_duration};
use crate::worker::threads::ThreadGroup;
use crate::worker::{BurstTimer, Shared, WorkerContext};
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Controller polling period
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run the populate phase and return the reopened connection
pub fn run_populate(shared: &Shared, backend: &dyn Backend) -> Result<Arc<dyn Connection>> {
    let config = &shared.config;
    let state = &shared.state;
    let icount = config.populate.icount;

    info!(
        "Starting {} populate thread(s) for {} items",
        config.populate.threads, icount
    );
    let start = Instant::now();

    let mut group = ThreadGroup::new(ThreadRole::Populate, shared);
    if let Err(err) = group.start(config.populate.threads, None, populate_thread) {
        state.fail();
        group.join().ok();
        return Err(err).context("Failed to start populate threads");
    }

    let report_interval = Duration::from_secs(config.output.report_interval as u64);
    let mut last_report = Instant::now();
    let mut last_inserts = 0;
    loop {
        let inserts = state
            .registry
            .sum_ops(TrackKind::Insert, |role| role == ThreadRole::Populate);
        if inserts >= icount || state.is_stopped() {
            break;
        }

        state.wait(POLL_INTERVAL);

        if !report_interval.is_zero() && last_report.elapsed() >= report_interval {
            info!(
                "{} populate inserts in {} secs",
                inserts - last_inserts,
                report_interval.as_secs()
            );
            last_inserts = inserts;
            last_report = Instant::now();
        }
    }

    let joined = group.join();
    if state.has_failed() {
        return Err(RunError::WorkersFailed { phase: "populate" }.into());
    }
    joined?;

    let load_time = start.elapsed();
    info!("Finished load of {} items", icount);
    info!(
        "Load time: {}, load ops/sec: {:.0}",
        format_duration(load_time),
        calculate_rate(icount, load_time)
    );

    let merge_sleep = match config.populate.merge_sleep {
        secs if secs < 0 => load_time.as_secs(),
        secs => secs as u64,
    };
    if merge_sleep > 0 {
        info!("Sleeping {} seconds after populate", merge_sleep);
        state.wait(Duration::from_secs(merge_sleep));
    }

    shared
        .conn
        .close()
        .context("Failed to close connection after populate")?;
    backend
        .open()
        .context("Failed to reopen connection after populate")
}

/// Entry point of populate threads
pub fn populate_thread(ctx: &mut WorkerContext) -> std::result::Result<(), RunError> {
    let mut session = ctx.open_session("populate: open_session")?;
    let result = load(ctx, session.as_mut());
    let closed = session
        .close()
        .map_err(RunError::setup("populate: session close"));
    result.and(closed)
}

fn load(ctx: &mut WorkerContext, session: &mut dyn Session) -> std::result::Result<(), RunError> {
    let config = Arc::clone(&ctx.config);
    let icount = config.populate.icount;
    let ops_per_txn = config.populate.ops_per_txn as u64;

    // A single loader can use a bulk cursor
    let options = if config.populate.threads == 1 {
        CursorOptions::bulk()
    } else {
        CursorOptions::default()
    };
    let mut cursor = session
        .open_cursor(&config.uri(), options)
        .map_err(RunError::setup("populate: open_cursor"))?;

    let mut timer = BurstTimer::new(config.output.latency_aggregate);
    let mut in_txn = 0;
    let result = loop {
        if ctx.state.is_stopped() {
            break Ok(());
        }
        let keyno = ctx.state.next_insert_key();
        if keyno > icount {
            break Ok(());
        }

        if ops_per_txn > 0 && in_txn == 0 {
            if let Err(source) = session.begin_transaction(&config.store.transaction_config) {
                break Err(RunError::Storage {
                    op: "begin_transaction",
                    key: ctx.key.format(keyno).to_string(),
                    range: icount,
                    source,
                });
            }
        }

        cursor.set_key(ctx.key.format(keyno).as_bytes());
        cursor.set_value(ctx.value.as_slice());
        if let Err(source) = cursor.insert() {
            break Err(RunError::Storage {
                op: "insert",
                key: ctx.key.as_str().to_string(),
                range: icount,
                source,
            });
        }
        ctx.stats.insert.complete_op();
        if timer.complete() {
            timer.flush(&ctx.stats);
        }

        if ops_per_txn > 0 {
            in_txn += 1;
            if in_txn >= ops_per_txn {
                commit(session);
                in_txn = 0;
            }
        }
    };

    if in_txn > 0 && result.is_ok() {
        commit(session);
    }
    timer.flush(&ctx.stats);
    let closed = cursor
        .close()
        .map_err(RunError::setup("populate: cursor close"));
    result.and(closed)
}

fn commit(session: &mut dyn Session) {
    if let Err(err) = session.commit_transaction() {
        warn!(error = %err, "Fail committing, transaction was aborted");
    }
}

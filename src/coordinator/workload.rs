//! Workload phase
//!
//! Starts the read, insert and update groups and polls once per second until
//! `run_time` expires, `run_ops` operations completed, or a thread fails.
//! Every `report_interval` seconds it logs the throughput of the last
//! interval.
//!
//! In run-mix mode every worker walks the same mixed schedule, whatever group
//! it was started in.

use crate::error::RunError;
use crate::stats::ThreadRole;
use crate::worker::schedule::Schedule;
use crate::worker::threads::ThreadGroup;
use crate::worker::{worker_thread, Shared};
use crate::Result;
use std::time::Duration;
use tracing::{error, info};

/// Controller polling period
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Run the workload phase to completion
pub fn run_workload(shared: &Shared) -> Result<()> {
    let config = &shared.config;
    let state = &shared.state;
    let workload = &config.workload;

    state.reset_insert_key();

    let run_mix = if config.is_run_mix() {
        info!("Starting {} worker threads", config.worker_threads());
        Some(Schedule::run_mix(
            workload.run_mix_inserts,
            workload.run_mix_updates,
            workload.insert_rmw,
        )?)
    } else {
        info!(
            "Starting worker threads: read {}, insert {}, update {}",
            workload.read_threads, workload.insert_threads, workload.update_threads
        );
        None
    };

    let mut groups = Vec::with_capacity(3);
    let started = [
        (ThreadRole::Read, workload.read_threads),
        (ThreadRole::Insert, workload.insert_threads),
        (ThreadRole::Update, workload.update_threads),
    ]
    .into_iter()
    .try_for_each(|(role, count)| {
        let mut group = ThreadGroup::new(role, shared);
        let result = group.start(count, run_mix.as_ref(), worker_thread);
        groups.push(group);
        result
    });

    match started {
        Ok(()) => poll(shared),
        Err(err) => {
            error!("{}", err);
            state.fail();
        }
    }

    state.request_stop();
    let mut joined = Ok(());
    for group in groups {
        joined = joined.and(group.join());
    }

    if state.has_failed() {
        error!("Worker thread(s) exited without finishing");
        return Err(RunError::WorkersFailed { phase: "workload" }.into());
    }
    joined?;
    Ok(())
}

/// Wait for the end condition, logging throughput on the way
fn poll(shared: &Shared) {
    let state = &shared.state;
    let report_interval = shared.config.output.report_interval;
    let run_ops = shared.config.workload.run_ops;
    let mut run_time = shared.config.workload.run_time;
    let mut interval = report_interval;
    let mut last = [0u64; 4];

    while !state.wait(POLL_INTERVAL) {
        if run_time != 0 {
            run_time -= 1;
            if run_time == 0 {
                break;
            }
            if interval == 0 && run_ops == 0 {
                continue;
            }
        }

        let totals = state.refresh_totals();
        if run_ops != 0 && run_ops <= totals.data_ops() {
            break;
        }

        if interval == 0 {
            continue;
        }
        interval -= 1;
        if interval > 0 {
            continue;
        }
        interval = report_interval;

        let now = [
            totals.read.get(),
            totals.insert.get(),
            totals.update.get(),
            totals.checkpoint.get(),
        ];
        info!(
            "{} reads, {} inserts, {} updates, {} checkpoints in {} secs",
            now[0] - last[0],
            now[1] - last[1],
            now[2] - last[2],
            now[3] - last[3],
            report_interval
        );
        last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::coordinator::state::RunState;
    use crate::stats::TrackKind;
    use crate::store::memory::MemoryBackend;
    use crate::store::{Backend, CursorOptions};
    use std::sync::Arc;
    use std::time::Instant;

    fn workload_config(icount: u64) -> Config {
        let mut config = Config::default();
        config.populate.icount = icount;
        config.workload.key_sz = 10;
        config.workload.data_sz = 16;
        config.workload.run_time = 0;
        config.output.report_interval = 1;
        config
    }

    /// Table holding keys `1..=icount`
    fn loaded(config: Config, backend: &MemoryBackend) -> Shared {
        let conn = backend.open().unwrap();
        let mut session = conn.open_session().unwrap();
        session.create(&config.uri(), "").unwrap();
        let mut cursor = session
            .open_cursor(&config.uri(), CursorOptions::bulk())
            .unwrap();
        for keyno in 1..=config.populate.icount {
            cursor.set_key(format!("{:010}", keyno).as_bytes());
            cursor.set_value(&[b'a'; 16]);
            cursor.insert().unwrap();
        }
        cursor.close().unwrap();
        session.close().unwrap();

        Shared {
            config: Arc::new(config),
            state: Arc::new(RunState::new()),
            conn,
        }
    }

    #[test]
    fn test_run_ops_stops_pure_read_workload() {
        let mut config = workload_config(1000);
        config.workload.read_threads = 2;
        config.workload.run_ops = 500;
        let backend = MemoryBackend::new();
        let shared = loaded(config, &backend);

        run_workload(&shared).unwrap();

        let totals = shared.state.refresh_totals();
        assert_eq!(totals.data_ops(), 500);
        assert_eq!(totals.read.get(), 500);
        assert!(!shared.state.has_failed());
    }

    #[test]
    fn test_storage_error_fails_phase_before_run_time() {
        let mut config = workload_config(100);
        config.workload.read_threads = 2;
        config.workload.run_time = 60;
        let backend = MemoryBackend::new();
        let shared = loaded(config, &backend);
        backend.faults().fail_searches_after(50);

        let start = Instant::now();
        let err = run_workload(&shared).unwrap_err();

        assert!(start.elapsed() < Duration::from_secs(30));
        assert!(shared.state.has_failed());
        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::WorkersFailed { phase: "workload" })
        ));
    }

    #[test]
    fn test_run_mix_workload() {
        let mut config = workload_config(200);
        config.workload.read_threads = 2;
        config.workload.run_mix_inserts = 20;
        config.workload.run_mix_updates = 30;
        config.workload.run_time = 1;
        let backend = MemoryBackend::new();
        let shared = loaded(config, &backend);

        run_workload(&shared).unwrap();

        let registry = &shared.state.registry;
        assert_eq!(registry.len(), 2);
        assert!(registry.sum_ops(TrackKind::Read, |_| true) > 0);
        assert!(registry.sum_ops(TrackKind::Insert, |_| true) > 0);
        assert!(registry.sum_ops(TrackKind::Update, |_| true) > 0);
        // Every completed call made it into the histograms
        for kind in [TrackKind::Read, TrackKind::Insert, TrackKind::Update] {
            let ops = registry.sum_ops(kind, |_| true);
            assert_eq!(registry.histogram(kind, |_| true).total(), ops);
        }
    }

    #[test]
    fn test_aggregated_latency_run_mix() {
        let mut config = workload_config(1000);
        config.workload.read_threads = 2;
        config.workload.run_mix_inserts = 10;
        config.workload.run_mix_updates = 10;
        config.workload.run_ops = 5000;
        config.output.latency_aggregate = 1000;
        let backend = MemoryBackend::new();
        let shared = loaded(config, &backend);

        run_workload(&shared).unwrap();

        let registry = &shared.state.registry;
        let mut total = 0;
        for kind in [TrackKind::Read, TrackKind::Insert, TrackKind::Update] {
            let ops = registry.sum_ops(kind, |_| true);
            assert!(ops > 0, "no {} operations", kind);
            total += ops;

            // Bursts end at every change of kind, so each call is counted
            // once, in its own kind's histogram, and flushed by exit
            assert_eq!(registry.histogram(kind, |_| true).total(), ops);
            let snapshot = registry.snapshot(kind, |_| true);
            assert_eq!(snapshot.flushed, ops);
            assert!(snapshot.min() > 0);
            assert!(snapshot.max_ns >= snapshot.min());
        }
        assert_eq!(total, 5000);
        assert_eq!(registry.sum_ops(TrackKind::Checkpoint, |_| true), 0);
    }

    #[test]
    fn test_per_role_groups() {
        let mut config = workload_config(100);
        config.workload.read_threads = 1;
        config.workload.insert_threads = 1;
        config.workload.update_threads = 1;
        config.workload.run_time = 1;
        let backend = MemoryBackend::new();
        let shared = loaded(config, &backend);

        run_workload(&shared).unwrap();

        let registry = &shared.state.registry;
        assert_eq!(registry.len(), 3);
        let inserted = registry.sum_ops(TrackKind::Insert, |r| r == ThreadRole::Insert);
        assert_eq!(inserted, shared.state.insert_key());
        assert_eq!(registry.sum_ops(TrackKind::Insert, |r| r == ThreadRole::Read), 0);
    }

    #[test]
    fn test_invalid_mix_is_rejected() {
        let mut config = workload_config(10);
        config.workload.run_mix_inserts = 80;
        config.workload.run_mix_updates = 40;
        let backend = MemoryBackend::new();
        let shared = loaded(config, &backend);

        assert!(run_workload(&shared).is_err());
        assert!(shared.state.registry.is_empty());
    }
}

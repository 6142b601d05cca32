//! Monitor thread
//!
//! Samples the statistics registry every `output.sample_interval` seconds and
//! appends one row to the monitor report. Throughput is the operation delta
//! since the previous sample divided by the interval; the average latency
//! covers the same window, minimum and maximum are cumulative.
//!
//! A stop requested mid-interval ends the loop without a final sample.

use super::state::RunState;
use crate::output::csv::{LatencyTriple, MonitorRow, MonitorWriter};
use crate::stats::{TrackKind, TrackSnapshot};
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

/// Timestamp format of monitor rows
const TIMESTAMP_FORMAT: &str = "%b %d %H:%M:%S";

/// Sampler state carried between rows
pub struct Monitor {
    state: Arc<RunState>,
    interval: u64,
    last_read: TrackSnapshot,
    last_insert: TrackSnapshot,
    last_update: TrackSnapshot,
}

impl Monitor {
    pub fn new(state: Arc<RunState>, sample_interval: u32) -> Self {
        Self {
            state,
            interval: u64::from(sample_interval.max(1)),
            last_read: TrackSnapshot::empty(),
            last_insert: TrackSnapshot::empty(),
            last_update: TrackSnapshot::empty(),
        }
    }

    /// Take one sample and advance the window
    pub fn sample(&mut self) -> MonitorRow {
        let registry = &self.state.registry;
        let read = registry.snapshot(TrackKind::Read, |_| true);
        let insert = registry.snapshot(TrackKind::Insert, |_| true);
        let update = registry.snapshot(TrackKind::Update, |_| true);

        let row = MonitorRow {
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            reads_per_sec: self.per_sec(&read, &self.last_read),
            inserts_per_sec: self.per_sec(&insert, &self.last_insert),
            updates_per_sec: self.per_sec(&update, &self.last_update),
            checkpoint: self.state.checkpoint_in_progress(),
            read: latency(&read, &self.last_read),
            insert: latency(&insert, &self.last_insert),
            update: latency(&update, &self.last_update),
        };

        self.last_read = read;
        self.last_insert = insert;
        self.last_update = update;
        row
    }

    fn per_sec(&self, now: &TrackSnapshot, last: &TrackSnapshot) -> u64 {
        now.ops.saturating_sub(last.ops) / self.interval
    }
}

fn latency(now: &TrackSnapshot, last: &TrackSnapshot) -> LatencyTriple {
    LatencyTriple {
        avg: now.avg_since(last),
        min: now.min(),
        max: now.max_ns,
    }
}

/// Start the monitor thread
pub fn spawn_monitor(
    state: Arc<RunState>,
    sample_interval: u32,
    writer: MonitorWriter,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            if let Err(err) = monitor_loop(&state, sample_interval, writer) {
                error!("Monitor failed: {:#}", err);
                state.fail();
            }
        })
        .context("Failed to spawn monitor thread")
}

fn monitor_loop(state: &Arc<RunState>, sample_interval: u32, mut writer: MonitorWriter) -> Result<()> {
    let interval = Duration::from_secs(u64::from(sample_interval));
    let mut monitor = Monitor::new(Arc::clone(state), sample_interval);

    while !state.wait(interval) {
        let row = monitor.sample();
        writer
            .append(&row)
            .context("Failed to write monitor report")?;
    }

    debug!("Monitor stopped");
    Ok(())
}

//! Result reporting
//!
//! - `csv`: monitor time series written while the run is in progress
//! - `text`: final results printed to the console
//! - `json`: final results written to `<home>/latency.json`

pub mod csv;
pub mod json;
pub mod text;

use crate::coordinator::state::RunState;
use crate::stats::{LatencySummary, ThreadRole, TrackKind};
use serde::Serialize;
use std::time::Duration;

/// Operation counts of the workload and checkpoint threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    pub read: u64,
    pub insert: u64,
    pub update: u64,
    pub checkpoint: u64,
}

impl OperationCounts {
    /// Read, insert and update operations
    pub fn total(&self) -> u64 {
        self.read + self.insert + self.update
    }
}

/// Latency summaries per operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencyReport {
    pub read: LatencySummary,
    pub insert: LatencySummary,
    pub update: LatencySummary,
    pub checkpoint: LatencySummary,
}

/// Final summation of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub elapsed: Duration,
    pub operations: OperationCounts,
    pub latency: LatencyReport,
}

impl RunReport {
    /// Sum every thread except the populate threads
    pub fn collect(state: &RunState, elapsed: Duration) -> Self {
        let totals = state.refresh_totals();
        let operations = OperationCounts {
            read: totals.read.get(),
            insert: totals.insert.get(),
            update: totals.update.get(),
            checkpoint: totals.checkpoint.get(),
        };

        let counted = |role: ThreadRole| role != ThreadRole::Populate;
        let summary = |kind: TrackKind| state.registry.summary(kind, counted);
        let latency = LatencyReport {
            read: summary(TrackKind::Read),
            insert: summary(TrackKind::Insert),
            update: summary(TrackKind::Update),
            checkpoint: summary(TrackKind::Checkpoint),
        };

        Self {
            elapsed,
            operations,
            latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_skips_populate() {
        let state = RunState::new();
        let populate = state.registry.register(ThreadRole::Populate);
        let reader = state.registry.register(ThreadRole::Read);
        let ckpt = state.registry.register(ThreadRole::Checkpoint);

        populate.insert.complete_op();
        populate.insert.record_batch(5_000_000, 1);
        for _ in 0..3 {
            reader.read.complete_op();
        }
        reader.read.record_batch(3_000, 3);
        ckpt.checkpoint.complete_op();
        ckpt.checkpoint.record_batch(2_500_000, 1);

        let report = RunReport::collect(&state, Duration::from_secs(1));
        assert_eq!(
            report.operations,
            OperationCounts {
                read: 3,
                insert: 0,
                update: 0,
                checkpoint: 1
            }
        );
        assert_eq!(report.operations.total(), 3);
        assert_eq!(report.latency.read.avg_ns, 1_000);
        assert_eq!(report.latency.insert.ops, 0);
        assert_eq!(report.latency.checkpoint.max_ns, 2_500_000);
    }
}

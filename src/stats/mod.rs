//! Statistics collection
//!
//! Lock-free per-thread latency tracking with cache-line aligned counters.
//!
//! Every thread owns one [`ThreadStats`] holding a [`LatencyTrack`] per
//! operation kind. Only the owning thread writes a track; the monitor and the
//! phase controllers read it concurrently through the [`StatsRegistry`],
//! tolerating values that are a few operations stale.
//!
//! # Latency aggregation
//!
//! Workers do not time single calls. They time a burst of calls and hand the
//! elapsed time to [`ThreadStats::flush`], which records the per-call average
//! into each track weighted by the number of calls that track saw in the burst.
//!
//! # Example
//!
//! ```
//! use kvpulse::stats::{StatsRegistry, ThreadRole, TrackKind};
//!
//! let registry = StatsRegistry::new();
//! let stats = registry.register(ThreadRole::Read);
//!
//! stats.read.complete_op();
//! stats.read.complete_op();
//! stats.flush(4_000, 2);
//!
//! let summary = registry.summary(TrackKind::Read, |_| true);
//! assert_eq!(summary.ops, 2);
//! assert_eq!(summary.avg_ns, 2_000);
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Cache-line aligned atomic counter to prevent false sharing
///
/// On most modern CPUs, cache lines are 64 bytes. Counters updated by
/// different threads are padded so each occupies its own line.
///
/// # Memory Layout
///
/// ```text
/// [value: 8 bytes][padding: 56 bytes] = 64 bytes total
/// ```
#[repr(align(64))]
#[derive(Debug)]
pub struct AlignedCounter {
    value: AtomicU64,
    _padding: [u8; 56],
}

impl AlignedCounter {
    /// Create a new counter with initial value 0
    pub fn new() -> Self {
        Self::with_value(0)
    }

    /// Create a new counter with the specified initial value
    pub fn with_value(val: u64) -> Self {
        Self {
            value: AtomicU64::new(val),
            _padding: [0; 56],
        }
    }

    /// Increment the counter by the specified amount
    ///
    /// Uses `Ordering::Relaxed`: no ordering is needed between different
    /// counters.
    #[inline]
    pub fn add(&self, val: u64) {
        self.value.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment and return the new value
    #[inline]
    pub fn increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::Relaxed) + 1
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, val: u64) {
        self.value.store(val, Ordering::Relaxed);
    }
}

impl Default for AlignedCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Microsecond buckets: 0-999us at 1us each
pub const US_BUCKETS: usize = 1000;
/// Millisecond buckets: 0-999ms at 1ms each
pub const MS_BUCKETS: usize = 1000;
/// Second buckets: 0-99s at 1s each, plus one overflow bucket
pub const SEC_BUCKETS: usize = 101;

const NS_PER_US: u64 = 1_000;
const NS_PER_MS: u64 = 1_000_000;
const NS_PER_SEC: u64 = 1_000_000_000;

/// Three-tier latency histogram
///
/// A value lands in exactly one bucket chosen by integer division of the
/// nanosecond value: whole microseconds below 1ms, whole milliseconds below
/// 1s, whole seconds below 100s, and the overflow bucket beyond that.
#[derive(Debug)]
pub struct TieredHistogram {
    us: Box<[AtomicU64]>,
    ms: Box<[AtomicU64]>,
    sec: Box<[AtomicU64]>,
}

fn atomic_buckets(n: usize) -> Box<[AtomicU64]> {
    (0..n).map(|_| AtomicU64::new(0)).collect()
}

impl TieredHistogram {
    pub fn new() -> Self {
        Self {
            us: atomic_buckets(US_BUCKETS),
            ms: atomic_buckets(MS_BUCKETS),
            sec: atomic_buckets(SEC_BUCKETS),
        }
    }

    /// Add `weight` samples of `value_ns`
    #[inline]
    pub fn record(&self, value_ns: u64, weight: u64) {
        let bucket = if value_ns < 1000 * NS_PER_US {
            &self.us[(value_ns / NS_PER_US) as usize]
        } else if value_ns < 1000 * NS_PER_MS {
            &self.ms[(value_ns / NS_PER_MS) as usize]
        } else if value_ns < 100 * NS_PER_SEC {
            &self.sec[(value_ns / NS_PER_SEC) as usize]
        } else {
            &self.sec[SEC_BUCKETS - 1]
        };
        bucket.fetch_add(weight, Ordering::Relaxed);
    }

    /// Point-in-time copy of all buckets
    pub fn snapshot(&self) -> HistogramSnapshot {
        let load = |buckets: &[AtomicU64]| -> Vec<u64> {
            buckets.iter().map(|b| b.load(Ordering::Relaxed)).collect()
        };
        HistogramSnapshot {
            us: load(&self.us),
            ms: load(&self.ms),
            sec: load(&self.sec),
        }
    }
}

impl Default for TieredHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of a [`TieredHistogram`], mergeable across threads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramSnapshot {
    pub us: Vec<u64>,
    pub ms: Vec<u64>,
    pub sec: Vec<u64>,
}

impl HistogramSnapshot {
    pub fn empty() -> Self {
        Self {
            us: vec![0; US_BUCKETS],
            ms: vec![0; MS_BUCKETS],
            sec: vec![0; SEC_BUCKETS],
        }
    }

    pub fn merge(&mut self, other: &HistogramSnapshot) {
        for (dst, src) in [
            (&mut self.us, &other.us),
            (&mut self.ms, &other.ms),
            (&mut self.sec, &other.sec),
        ] {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += s;
            }
        }
    }

    /// Sum of all buckets across the three tiers
    pub fn total(&self) -> u64 {
        self.us.iter().chain(&self.ms).chain(&self.sec).sum()
    }

    /// Upper bound of the bucket holding the `p`-th percentile (0.0-100.0), in ns
    ///
    /// Returns 0 for an empty histogram. The overflow bucket reports 100s.
    pub fn percentile(&self, p: f64) -> u64 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        let target = ((p / 100.0) * total as f64).ceil().max(1.0) as u64;

        let tiers = [
            (&self.us, NS_PER_US),
            (&self.ms, NS_PER_MS),
            (&self.sec, NS_PER_SEC),
        ];
        let mut seen = 0;
        for (buckets, unit) in tiers {
            for (i, count) in buckets.iter().enumerate() {
                seen += count;
                if seen >= target {
                    return ((i as u64 + 1) * unit).min(100 * NS_PER_SEC);
                }
            }
        }
        100 * NS_PER_SEC
    }
}

/// Latency record for one operation kind of one thread
#[derive(Debug)]
pub struct LatencyTrack {
    ops: AlignedCounter,
    /// Completed calls not yet folded into the histogram
    aggregated: AtomicU64,
    /// Calls already folded in, the ones `total_ns` accounts for
    flushed: AtomicU64,
    total_ns: AtomicU64,
    min_ns: AtomicU64,
    max_ns: AtomicU64,
    histogram: TieredHistogram,
}

impl LatencyTrack {
    pub fn new() -> Self {
        Self {
            ops: AlignedCounter::new(),
            aggregated: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            max_ns: AtomicU64::new(0),
            histogram: TieredHistogram::new(),
        }
    }

    /// Count one successful call awaiting the next flush
    #[inline]
    pub fn complete_op(&self) {
        self.ops.add(1);
        self.aggregated.fetch_add(1, Ordering::Relaxed);
    }

    /// Calls completed since the last flush
    #[inline]
    pub fn pending(&self) -> u64 {
        self.aggregated.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn ops(&self) -> u64 {
        self.ops.get()
    }

    /// Fold the pending calls of this track into the statistics
    ///
    /// `elapsed_ns` covers `calls` calls in total, possibly of several kinds;
    /// this track is weighted by its own pending count. No-op when either
    /// count is zero.
    pub fn record_batch(&self, elapsed_ns: u64, calls: u64) {
        let weight = self.aggregated.load(Ordering::Relaxed);
        if weight == 0 || calls == 0 {
            return;
        }

        let per_call = elapsed_ns / calls;
        let share = (elapsed_ns as u128 * weight as u128 / calls as u128) as u64;
        self.total_ns.fetch_add(share, Ordering::Relaxed);
        self.flushed.fetch_add(weight, Ordering::Relaxed);
        self.min_ns.fetch_min(per_call, Ordering::Relaxed);
        self.max_ns.fetch_max(per_call, Ordering::Relaxed);
        self.histogram.record(per_call, weight);

        self.aggregated.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            ops: self.ops.get(),
            flushed: self.flushed.load(Ordering::Relaxed),
            total_ns: self.total_ns.load(Ordering::Relaxed),
            min_ns: self.min_ns.load(Ordering::Relaxed),
            max_ns: self.max_ns.load(Ordering::Relaxed),
        }
    }

    pub fn histogram(&self) -> &TieredHistogram {
        &self.histogram
    }
}

impl Default for LatencyTrack {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters of one or more tracks at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSnapshot {
    pub ops: u64,
    /// Operations covered by `total_ns`; lags `ops` by the open burst
    pub flushed: u64,
    pub total_ns: u64,
    /// `u64::MAX` until the first sample
    pub min_ns: u64,
    pub max_ns: u64,
}

impl TrackSnapshot {
    pub fn empty() -> Self {
        Self {
            ops: 0,
            flushed: 0,
            total_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
        }
    }

    pub fn merge(&mut self, other: &TrackSnapshot) {
        self.ops += other.ops;
        self.flushed += other.flushed;
        self.total_ns += other.total_ns;
        self.min_ns = self.min_ns.min(other.min_ns);
        self.max_ns = self.max_ns.max(other.max_ns);
    }

    /// Average latency of the operations flushed since `earlier`
    ///
    /// Calls of a burst still open are left out until the burst is flushed.
    pub fn avg_since(&self, earlier: &TrackSnapshot) -> u64 {
        let ops = self.flushed.saturating_sub(earlier.flushed);
        if ops == 0 {
            return 0;
        }
        self.total_ns.saturating_sub(earlier.total_ns) / ops
    }

    /// Minimum, reported as 0 when nothing was recorded
    pub fn min(&self) -> u64 {
        if self.min_ns == u64::MAX {
            0
        } else {
            self.min_ns
        }
    }
}

/// Operation kinds tracked separately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Read,
    Insert,
    Update,
    Checkpoint,
}

impl TrackKind {
    pub fn name(&self) -> &'static str {
        match self {
            TrackKind::Read => "read",
            TrackKind::Insert => "insert",
            TrackKind::Update => "update",
            TrackKind::Checkpoint => "checkpoint",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Role a thread was started in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadRole {
    Populate,
    Read,
    Insert,
    Update,
    Checkpoint,
}

impl ThreadRole {
    pub fn name(&self) -> &'static str {
        match self {
            ThreadRole::Populate => "populate",
            ThreadRole::Read => "read",
            ThreadRole::Insert => "insert",
            ThreadRole::Update => "update",
            ThreadRole::Checkpoint => "checkpoint",
        }
    }

    /// Read, insert and update workers of the workload phase
    pub fn is_workload(&self) -> bool {
        matches!(self, ThreadRole::Read | ThreadRole::Insert | ThreadRole::Update)
    }
}

impl fmt::Display for ThreadRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tracking data of one thread
#[derive(Debug)]
pub struct ThreadStats {
    pub role: ThreadRole,
    pub read: LatencyTrack,
    pub insert: LatencyTrack,
    pub update: LatencyTrack,
    pub checkpoint: LatencyTrack,
}

impl ThreadStats {
    pub fn new(role: ThreadRole) -> Self {
        Self {
            role,
            read: LatencyTrack::new(),
            insert: LatencyTrack::new(),
            update: LatencyTrack::new(),
            checkpoint: LatencyTrack::new(),
        }
    }

    pub fn track(&self, kind: TrackKind) -> &LatencyTrack {
        match kind {
            TrackKind::Read => &self.read,
            TrackKind::Insert => &self.insert,
            TrackKind::Update => &self.update,
            TrackKind::Checkpoint => &self.checkpoint,
        }
    }

    /// Flush a timed burst of `calls` calls into every data track
    ///
    /// Tracks with nothing pending are left untouched.
    pub fn flush(&self, elapsed_ns: u64, calls: u64) {
        self.insert.record_batch(elapsed_ns, calls);
        self.read.record_batch(elapsed_ns, calls);
        self.update.record_batch(elapsed_ns, calls);
    }
}

/// Aggregated latency of one operation kind, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub ops: u64,
    pub avg_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub p50_ns: u64,
    pub p90_ns: u64,
    pub p99_ns: u64,
    pub p999_ns: u64,
}

impl LatencySummary {
    fn new(track: &TrackSnapshot, histogram: &HistogramSnapshot) -> Self {
        Self {
            ops: track.ops,
            avg_ns: track.avg_since(&TrackSnapshot::empty()),
            min_ns: track.min(),
            max_ns: track.max_ns,
            p50_ns: histogram.percentile(50.0),
            p90_ns: histogram.percentile(90.0),
            p99_ns: histogram.percentile(99.0),
            p999_ns: histogram.percentile(99.9),
        }
    }
}

/// Registry of every thread's tracking data
///
/// Threads register at startup and the registry keeps their stats alive after
/// the thread exits, so the monitor and the final report can still read them.
/// Everything is reclaimed when the last `Arc` (normally the run state) drops.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    threads: Mutex<Vec<Arc<ThreadStats>>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register the tracking data for a new thread
    pub fn register(&self, role: ThreadRole) -> Arc<ThreadStats> {
        let stats = Arc::new(ThreadStats::new(role));
        self.lock().push(Arc::clone(&stats));
        stats
    }

    /// Number of registered threads
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of completed operations of `kind` over threads whose role matches
    pub fn sum_ops(&self, kind: TrackKind, filter: impl Fn(ThreadRole) -> bool) -> u64 {
        self.lock()
            .iter()
            .filter(|s| filter(s.role))
            .map(|s| s.track(kind).ops())
            .sum()
    }

    /// Merged counters of `kind` over threads whose role matches
    pub fn snapshot(&self, kind: TrackKind, filter: impl Fn(ThreadRole) -> bool) -> TrackSnapshot {
        let mut merged = TrackSnapshot::empty();
        for stats in self.lock().iter().filter(|s| filter(s.role)) {
            merged.merge(&stats.track(kind).snapshot());
        }
        merged
    }

    /// Merged histogram of `kind` over threads whose role matches
    pub fn histogram(&self, kind: TrackKind, filter: impl Fn(ThreadRole) -> bool) -> HistogramSnapshot {
        let mut merged = HistogramSnapshot::empty();
        for stats in self.lock().iter().filter(|s| filter(s.role)) {
            merged.merge(&stats.track(kind).histogram().snapshot());
        }
        merged
    }

    /// Full latency summary of `kind`, percentiles included
    pub fn summary(&self, kind: TrackKind, filter: impl Fn(ThreadRole) -> bool) -> LatencySummary {
        let mut track = TrackSnapshot::empty();
        let mut histogram = HistogramSnapshot::empty();
        for stats in self.lock().iter().filter(|s| filter(s.role)) {
            let t = stats.track(kind);
            track.merge(&t.snapshot());
            histogram.merge(&t.histogram().snapshot());
        }
        LatencySummary::new(&track, &histogram)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<ThreadStats>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_aligned_counter_layout() {
        assert_eq!(size_of::<AlignedCounter>(), 64);
        assert_eq!(align_of::<AlignedCounter>(), 64);

        let counter = AlignedCounter::with_value(5);
        counter.add(3);
        assert_eq!(counter.increment(), 9);
        counter.set(1);
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn test_histogram_tier_boundaries() {
        let hist = TieredHistogram::new();
        hist.record(999, 1); // us[0]
        hist.record(999_999, 2); // us[999]
        hist.record(1_000_000, 3); // ms[1]
        hist.record(999_999_999, 4); // ms[999]
        hist.record(1_000_000_000, 5); // sec[1]
        hist.record(99_999_999_999, 6); // sec[99]
        hist.record(100_000_000_000, 7); // overflow
        hist.record(u64::MAX, 8); // overflow

        let snap = hist.snapshot();
        assert_eq!(snap.us[0], 1);
        assert_eq!(snap.us[999], 2);
        assert_eq!(snap.ms[1], 3);
        assert_eq!(snap.ms[999], 4);
        assert_eq!(snap.sec[1], 5);
        assert_eq!(snap.sec[99], 6);
        assert_eq!(snap.sec[SEC_BUCKETS - 1], 15);
        assert_eq!(snap.total(), 36);
    }

    #[test]
    fn test_percentiles() {
        let hist = TieredHistogram::new();
        hist.record(5_000, 90); // 5us
        hist.record(2_500_000, 9); // 2ms
        hist.record(3_000_000_000, 1); // 3s

        let snap = hist.snapshot();
        assert_eq!(snap.percentile(50.0), 6_000);
        assert_eq!(snap.percentile(90.0), 6_000);
        assert_eq!(snap.percentile(99.0), 3_000_000);
        assert_eq!(snap.percentile(100.0), 4_000_000_000);
        assert_eq!(HistogramSnapshot::empty().percentile(99.0), 0);
    }

    #[test]
    fn test_record_batch_zero_is_noop() {
        let track = LatencyTrack::new();
        track.record_batch(1_000, 0);
        track.record_batch(1_000, 5);

        let snap = track.snapshot();
        assert_eq!(snap, TrackSnapshot::empty());
        assert_eq!(track.histogram().snapshot().total(), 0);
    }

    #[test]
    fn test_record_batch_weights_by_calls() {
        let track = LatencyTrack::new();
        for _ in 0..4 {
            track.complete_op();
        }
        track.record_batch(8_000, 4);

        let snap = track.snapshot();
        assert_eq!(snap.ops, 4);
        assert_eq!(snap.total_ns, 8_000);
        assert_eq!(snap.min_ns, 2_000);
        assert_eq!(snap.max_ns, 2_000);
        assert_eq!(track.pending(), 0);

        let hist = track.histogram().snapshot();
        assert_eq!(hist.us[2], 4);
    }

    #[test]
    fn test_min_max_monotonic() {
        let track = LatencyTrack::new();
        let samples = [5_000u64, 1_000, 9_000, 3_000, 12_000, 500];
        let mut prev_min = u64::MAX;
        let mut prev_max = 0;
        for elapsed in samples {
            track.complete_op();
            track.record_batch(elapsed, 1);
            let snap = track.snapshot();
            assert!(snap.min_ns <= prev_min);
            assert!(snap.max_ns >= prev_max);
            prev_min = snap.min_ns;
            prev_max = snap.max_ns;
        }
        assert_eq!(prev_min, 500);
        assert_eq!(prev_max, 12_000);
    }

    #[test]
    fn test_histogram_total_matches_ops_after_flush() {
        let stats = ThreadStats::new(ThreadRole::Read);
        // Mixed burst: 3 reads then 2 updates, flushed together
        for _ in 0..3 {
            stats.read.complete_op();
        }
        for _ in 0..2 {
            stats.update.complete_op();
        }
        stats.flush(10_000, 5);

        for kind in [TrackKind::Read, TrackKind::Update, TrackKind::Insert] {
            let track = stats.track(kind);
            assert_eq!(track.histogram().snapshot().total(), track.ops());
        }
        assert_eq!(stats.read.snapshot().total_ns, 6_000);
        assert_eq!(stats.update.snapshot().total_ns, 4_000);
        assert_eq!(stats.insert.snapshot(), TrackSnapshot::empty());
    }

    #[test]
    fn test_avg_since() {
        let earlier = TrackSnapshot {
            ops: 10,
            flushed: 10,
            total_ns: 10_000,
            min_ns: 100,
            max_ns: 5_000,
        };
        let later = TrackSnapshot {
            ops: 20,
            flushed: 20,
            total_ns: 40_000,
            ..earlier
        };
        assert_eq!(later.avg_since(&earlier), 3_000);
        assert_eq!(earlier.avg_since(&earlier), 0);
        assert_eq!(TrackSnapshot::empty().min(), 0);
    }

    #[test]
    fn test_avg_ignores_open_burst() {
        let track = LatencyTrack::new();
        for _ in 0..4 {
            track.complete_op();
        }
        track.record_batch(4_000, 4);
        let first = track.snapshot();
        assert_eq!(first.avg_since(&TrackSnapshot::empty()), 1_000);

        // Two calls completed but not flushed yet
        track.complete_op();
        track.complete_op();
        let mid_burst = track.snapshot();
        assert_eq!(mid_burst.ops, 6);
        assert_eq!(mid_burst.flushed, 4);
        assert_eq!(mid_burst.avg_since(&first), 0);

        track.record_batch(6_000, 2);
        let flushed = track.snapshot();
        assert_eq!(flushed.avg_since(&mid_burst), 3_000);
        assert_eq!(flushed.avg_since(&first), 3_000);
    }

    #[test]
    fn test_registry_filters_by_role() {
        let registry = StatsRegistry::new();
        let populate = registry.register(ThreadRole::Populate);
        let reader = registry.register(ThreadRole::Read);
        let inserter = registry.register(ThreadRole::Insert);

        for _ in 0..100 {
            populate.insert.complete_op();
        }
        for _ in 0..7 {
            reader.read.complete_op();
        }
        for _ in 0..3 {
            inserter.insert.complete_op();
        }

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.sum_ops(TrackKind::Insert, |_| true), 103);
        assert_eq!(registry.sum_ops(TrackKind::Insert, |r| r.is_workload()), 3);
        assert_eq!(registry.sum_ops(TrackKind::Read, |r| r.is_workload()), 7);
    }

    #[test]
    fn test_registry_summary_merges_threads() {
        let registry = StatsRegistry::new();
        let a = registry.register(ThreadRole::Read);
        let b = registry.register(ThreadRole::Read);

        a.read.complete_op();
        a.flush(1_000, 1);
        b.read.complete_op();
        b.flush(3_000_000, 1);

        let summary = registry.summary(TrackKind::Read, |_| true);
        assert_eq!(summary.ops, 2);
        assert_eq!(summary.min_ns, 1_000);
        assert_eq!(summary.max_ns, 3_000_000);
        assert_eq!(summary.avg_ns, 1_500_500);
        assert_eq!(summary.p50_ns, 2_000);
        assert_eq!(summary.p99_ns, 4_000_000);

        let empty = registry.summary(TrackKind::Update, |_| true);
        assert_eq!(empty.ops, 0);
        assert_eq!(empty.min_ns, 0);
    }
}

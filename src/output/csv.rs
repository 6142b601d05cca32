//! Monitor report output
//!
//! The monitor appends one comma-separated row per sample interval to
//! `<home>/monitor`:
//!
//! ```text
//! Oct 17 14:03:05,120344,0,3021,N,1802,512,90112,0,0,0,2210,730,65010
//! ```
//!
//! Columns: time, reads/sec, inserts/sec, updates/sec, checkpoint in progress
//! (`Y`/`N`), then average, minimum and maximum latency in nanoseconds for
//! reads, inserts and updates. An optional `#`-prefixed header names them.

use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Header row written when `output.monitor_header` is set
pub const MONITOR_HEADER: &str = "#time,\
read operations,insert operations,update operations,\
checkpoints,\
read average latency(NS),read minimum latency(NS),read maximum latency(NS),\
insert average latency(NS),insert minimum latency(NS),insert maximum latency(NS),\
update average latency(NS),update minimum latency(NS),update maximum latency(NS)";

/// Average, minimum and maximum latency in nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyTriple {
    pub avg: u64,
    pub min: u64,
    pub max: u64,
}

/// One monitor sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRow {
    pub timestamp: String,
    pub reads_per_sec: u64,
    pub inserts_per_sec: u64,
    pub updates_per_sec: u64,
    pub checkpoint: bool,
    pub read: LatencyTriple,
    pub insert: LatencyTriple,
    pub update: LatencyTriple,
}

/// Append-only writer for monitor rows
pub struct MonitorWriter {
    out: Box<dyn Write + Send>,
}

impl MonitorWriter {
    /// Create (truncate) the report file at `path`
    pub fn create(path: &Path, header: bool) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create monitor report: {}", path.display()))?;
        Self::new(Box::new(BufWriter::new(file)), header)
    }

    /// Write rows to an arbitrary sink
    pub fn new(out: Box<dyn Write + Send>, header: bool) -> Result<Self> {
        let mut writer = Self { out };
        if header {
            writeln!(writer.out, "{}", MONITOR_HEADER)?;
            writer.out.flush()?;
        }
        Ok(writer)
    }

    /// Append one row and flush it
    pub fn append(&mut self, row: &MonitorRow) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            row.timestamp,
            row.reads_per_sec,
            row.inserts_per_sec,
            row.updates_per_sec,
            if row.checkpoint { 'Y' } else { 'N' },
            row.read.avg,
            row.read.min,
            row.read.max,
            row.insert.avg,
            row.insert.min,
            row.insert.max,
            row.update.avg,
            row.update.min,
            row.update.max,
        )?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn row() -> MonitorRow {
        MonitorRow {
            timestamp: "Oct 17 14:03:05".to_string(),
            reads_per_sec: 120,
            inserts_per_sec: 3,
            updates_per_sec: 0,
            checkpoint: true,
            read: LatencyTriple {
                avg: 1800,
                min: 500,
                max: 9000,
            },
            insert: LatencyTriple::default(),
            update: LatencyTriple {
                avg: 2,
                min: 1,
                max: 3,
            },
        }
    }

    #[test]
    fn test_row_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor");

        let mut writer = MonitorWriter::create(&path, false).unwrap();
        writer.append(&row()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "Oct 17 14:03:05,120,3,0,Y,1800,500,9000,0,0,0,2,1,3\n");
    }

    #[test]
    fn test_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor");

        let mut writer = MonitorWriter::create(&path, true).unwrap();
        writer.append(&row()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("#time,read operations"));
        // Header and rows have the same column count
        assert_eq!(lines[0].split(',').count(), lines[1].split(',').count());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("monitor");
        assert!(MonitorWriter::create(&path, false).is_err());
    }
}

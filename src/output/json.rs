//! JSON output formatting
//!
//! The final results are written to `<home>/latency.json`:
//!
//! ```json
//! {
//!   "timestamp": "2026-10-17T14:03:05+00:00",
//!   "elapsed": { "micros": 20001234, "human": "20.00s" },
//!   "operations": { "read": 1200, "insert": 0, "update": 300, "checkpoint": 1, "total": 1500 },
//!   "latency": { "read": { "ops": 1200, "avg_ns": 1800, ... }, ... }
//! }
//! ```

use super::{LatencyReport, OperationCounts, RunReport};
use crate::util::time::format_duration;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            micros: d.as_micros() as u64,
            human: format_duration(d),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonOperations {
    #[serde(flatten)]
    pub counts: OperationCounts,
    pub total: u64,
}

/// Top-level JSON document
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub timestamp: String,
    pub elapsed: JsonDuration,
    pub operations: JsonOperations,
    pub latency: LatencyReport,
}

impl JsonReport {
    pub fn new(report: &RunReport) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            elapsed: JsonDuration::from_duration(report.elapsed),
            operations: JsonOperations {
                counts: report.operations,
                total: report.operations.total(),
            },
            latency: report.latency,
        }
    }
}

/// Write the final results as pretty-printed JSON
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON report: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &JsonReport::new(report))
        .with_context(|| format!("Failed to write JSON report: {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

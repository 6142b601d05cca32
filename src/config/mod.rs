//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, presets, and validation.
//!
//! The configuration is grouped into sections mirroring the phases of a run:
//!
//! ```toml
//! [store]
//! home = "WT_TEST"
//! table_name = "test"
//!
//! [populate]
//! icount = 500000
//! threads = 1
//!
//! [workload]
//! read_threads = 8
//! run_time = 20
//!
//! [output]
//! report_interval = 5
//! ```

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub populate: PopulateConfig,
    pub workload: WorkloadConfig,
    pub checkpoint: CheckpointConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Storage target identifier for the configured table
    pub fn uri(&self) -> String {
        format!("table:{}", self.store.table_name)
    }

    /// Whether the workload phase interleaves operations within each worker
    pub fn is_run_mix(&self) -> bool {
        self.workload.run_mix_inserts != 0 || self.workload.run_mix_updates != 0
    }

    /// Whether a workload phase is configured at all
    pub fn has_workload(&self) -> bool {
        self.workload.run_time != 0 || self.workload.run_ops != 0
    }

    /// Total number of read, insert and update worker threads
    pub fn worker_threads(&self) -> u32 {
        self.workload.read_threads + self.workload.insert_threads + self.workload.update_threads
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database home directory (reports and snapshots are written here)
    pub home: PathBuf,
    /// Table name, the storage target is `table:<name>`
    pub table_name: String,
    /// Create and populate the table before the workload
    pub create: bool,
    /// Connection configuration string passed to the backend
    pub conn_config: String,
    /// Table configuration string passed to the backend
    pub table_config: String,
    /// Transaction configuration string used by batched populate
    pub transaction_config: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            home: PathBuf::from("WT_TEST"),
            table_name: "test".to_string(),
            create: true,
            conn_config: "create".to_string(),
            table_config: String::new(),
            transaction_config: String::new(),
        }
    }
}

/// Populate phase configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateConfig {
    /// Number of records to load
    pub icount: u64,
    /// Number of populate threads
    pub threads: u32,
    /// Inserts per transaction (0 = no explicit transactions)
    pub ops_per_txn: u32,
    /// Seconds to sleep after the load (negative = as long as the load took)
    pub merge_sleep: i64,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        Self {
            icount: 5000,
            threads: 1,
            ops_per_txn: 0,
            merge_sleep: 0,
        }
    }
}

/// Workload phase configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Number of read threads
    pub read_threads: u32,
    /// Number of insert threads
    pub insert_threads: u32,
    /// Number of update threads
    pub update_threads: u32,
    /// Percentage of run-mix slots that insert (0-100)
    pub run_mix_inserts: u8,
    /// Percentage of run-mix slots that update (0-100)
    pub run_mix_updates: u8,
    /// Inserts search for the key first and require it to be absent
    pub insert_rmw: bool,
    /// Workload duration in seconds (0 = unbounded)
    pub run_time: u32,
    /// Total operations to execute (0 = unbounded)
    pub run_ops: u64,
    /// Key width in decimal digits
    pub key_sz: usize,
    /// Value size in bytes
    pub data_sz: usize,
    /// Size of the random key range beyond the populated records (0 = track inserts)
    pub random_range: u64,
    /// Use the Pareto 80/20 key distribution instead of uniform
    pub pareto: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            read_threads: 2,
            insert_threads: 0,
            update_threads: 0,
            run_mix_inserts: 0,
            run_mix_updates: 0,
            insert_rmw: false,
            run_time: 2,
            run_ops: 0,
            key_sz: 20,
            data_sz: 100,
            random_range: 0,
            pareto: false,
        }
    }
}

/// Checkpoint thread configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Number of checkpoint threads
    pub threads: u32,
    /// Seconds between checkpoints
    pub interval: u32,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            interval: 120,
        }
    }
}

/// Reporting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Seconds between throughput log lines (0 = quiet)
    pub report_interval: u32,
    /// Seconds between monitor samples (0 = no monitor thread)
    pub sample_interval: u32,
    /// Operations aggregated per latency measurement
    pub latency_aggregate: u32,
    /// Write a header row to the monitor report
    pub monitor_header: bool,
    /// Verbosity level (0 = warnings only)
    pub verbose: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_interval: 2,
            sample_interval: 0,
            latency_aggregate: 1,
            monitor_header: false,
            verbose: 1,
        }
    }
}

// Display trait implementations

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration:")?;
        writeln!(f, "  Store: {}", self.store)?;
        writeln!(f, "  Populate: {}", self.populate)?;
        writeln!(f, "  Workload: {}", self.workload)?;
        writeln!(f, "  Checkpoint: {}", self.checkpoint)?;
        writeln!(f, "  Output: {}", self.output)?;
        Ok(())
    }
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "home={}, table={}", self.home.display(), self.table_name)?;
        if self.create {
            write!(f, ", create")?;
        }
        if !self.conn_config.is_empty() {
            write!(f, ", conn_config=\"{}\"", self.conn_config)?;
        }
        if !self.table_config.is_empty() {
            write!(f, ", table_config=\"{}\"", self.table_config)?;
        }
        Ok(())
    }
}

impl fmt::Display for PopulateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "icount={}, threads={}", self.icount, self.threads)?;
        if self.ops_per_txn > 0 {
            write!(f, ", ops_per_txn={}", self.ops_per_txn)?;
        }
        if self.merge_sleep != 0 {
            write!(f, ", merge_sleep={}", self.merge_sleep)?;
        }
        Ok(())
    }
}

impl fmt::Display for WorkloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "threads read={} insert={} update={}, key_sz={}, data_sz={}",
            self.read_threads, self.insert_threads, self.update_threads, self.key_sz, self.data_sz
        )?;
        if self.run_mix_inserts != 0 || self.run_mix_updates != 0 {
            write!(
                f,
                ", mix={}% insert / {}% update",
                self.run_mix_inserts, self.run_mix_updates
            )?;
        }
        if self.insert_rmw {
            write!(f, ", insert_rmw")?;
        }
        if self.run_time != 0 {
            write!(f, ", run_time={}s", self.run_time)?;
        }
        if self.run_ops != 0 {
            write!(f, ", run_ops={}", self.run_ops)?;
        }
        if self.random_range != 0 {
            write!(f, ", random_range={}", self.random_range)?;
        }
        write!(f, ", distribution={}", if self.pareto { "pareto" } else { "uniform" })
    }
}

impl fmt::Display for CheckpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.threads == 0 {
            write!(f, "disabled")
        } else {
            write!(f, "threads={}, interval={}s", self.threads, self.interval)
        }
    }
}

impl fmt::Display for OutputConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "report_interval={}s, sample_interval={}s, latency_aggregate={}",
            self.report_interval, self.sample_interval, self.latency_aggregate
        )
    }
}

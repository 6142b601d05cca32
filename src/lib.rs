//! KVPulse - concurrent load generation and latency measurement for key/value stores
//!
//! KVPulse populates a table with sequential records, then drives a timed or
//! operation-bounded workload of reads, inserts and updates against it while
//! measuring aggregated per-call latency.
//!
//! # Architecture
//!
//! - **Phases**: create, populate, workload, with checkpoint and monitor threads alongside
//! - **Schedules**: per-thread cyclic operation mixes (pure or run-mix percentages)
//! - **Distributions**: uniform and Pareto 80/20 key selection
//! - **Stats**: burst-timed latency tracks with tiered us/ms/s histograms
//! - **Storage**: a small trait set with an in-process checkpointing backend

pub mod config;
pub mod coordinator;
pub mod distribution;
pub mod error;
pub mod output;
pub mod stats;
pub mod store;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::Runner;

/// Result type used throughout KVPulse
pub type Result<T> = anyhow::Result<T>;

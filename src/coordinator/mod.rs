//! Run sequencing
//!
//! A [`Runner`] drives one complete run against a storage backend:
//!
//! 1. Open a connection and create the table (`store.create`)
//! 2. Start the monitor (`output.sample_interval`)
//! 3. Populate the table, when creating
//! 4. With a workload configured: find the record count of an existing table,
//!    start the checkpoint threads, run the workload and report the results
//! 5. Stop and join the checkpoint threads and the monitor, close the
//!    connection
//!
//! Every thread polls the shared [`RunState`]; a failure anywhere latches the
//! error flag, stops the run and makes [`Runner::run`] return an error.

pub mod checkpoint;
pub mod monitor;
pub mod populate;
pub mod state;
pub mod workload;

use crate::config::Config;
use crate::error::RunError;
use crate::output::csv::MonitorWriter;
use crate::output::{json, text, RunReport};
use crate::stats::ThreadRole;
use crate::store::{Backend, Connection, CursorOptions, SearchResult};
use crate::worker::threads::ThreadGroup;
use crate::worker::Shared;
use crate::Result;
use anyhow::{bail, Context};
use state::RunState;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{error, info};

/// Monitor report file name under the home directory
pub const MONITOR_FILE: &str = "monitor";
/// Final JSON report file name under the home directory
pub const LATENCY_FILE: &str = "latency.json";

/// One run of the harness
pub struct Runner {
    config: Arc<Config>,
    state: Arc<RunState>,
}

impl Runner {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(RunState::new()),
        }
    }

    /// Shared state of the run, for callers that need to stop it early
    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    /// Execute every configured phase
    ///
    /// Returns the final results when a workload ran.
    pub fn run(&self, backend: &dyn Backend) -> Result<Option<RunReport>> {
        let conn = backend
            .open()
            .with_context(|| format!("Error connecting to {}", self.config.store.home.display()))?;
        let mut shared = Shared {
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
            conn,
        };

        let mut monitor = None;
        let mut checkpoints = None;
        let result = self.phases(backend, &mut shared, &mut monitor, &mut checkpoints);

        // Wind down whatever was started, keeping the first error
        self.state.request_stop();
        let mut joined = Ok(());
        if let Some(group) = checkpoints {
            joined = group.join();
        }
        if let Some(handle) = monitor {
            if handle.join().is_err() {
                self.state.fail();
                joined = joined.and(Err(RunError::Panicked { role: "monitor" }));
            }
        }
        let closed = shared
            .conn
            .close()
            .with_context(|| format!("Error closing connection to {}", self.config.store.home.display()));

        let report = result?;
        joined?;
        closed?;
        if self.state.has_failed() {
            bail!(RunError::WorkersFailed { phase: "run" });
        }

        let workload = &self.config.workload;
        if workload.run_time == 0 {
            info!("Run completed: {} operations", workload.run_ops);
        } else {
            info!("Run completed: {} seconds", workload.run_time);
        }
        Ok(report)
    }

    fn phases(
        &self,
        backend: &dyn Backend,
        shared: &mut Shared,
        monitor: &mut Option<JoinHandle<()>>,
        checkpoints: &mut Option<ThreadGroup>,
    ) -> Result<Option<RunReport>> {
        let config = Arc::clone(&self.config);

        if config.store.create {
            create_table(&shared.conn, &config)?;
        }

        if config.output.sample_interval != 0 {
            let path = config.store.home.join(MONITOR_FILE);
            let writer = MonitorWriter::create(&path, config.output.monitor_header)?;
            *monitor = Some(monitor::spawn_monitor(
                Arc::clone(&self.state),
                config.output.sample_interval,
                writer,
            )?);
        }

        if config.store.create {
            shared.conn = populate::run_populate(shared, backend)?;
        }

        if !config.has_workload() {
            return Ok(None);
        }

        if !config.store.create {
            let icount = find_table_count(&shared.conn, &config)?;
            info!("Found {} records in {}", icount, config.uri());
            let mut updated = (*config).clone();
            updated.populate.icount = icount;
            shared.config = Arc::new(updated);
        }

        if config.checkpoint.threads != 0 {
            info!("Starting {} checkpoint thread(s)", config.checkpoint.threads);
            let group = checkpoints.insert(ThreadGroup::new(ThreadRole::Checkpoint, shared));
            if let Err(err) = group.start(config.checkpoint.threads, None, checkpoint::checkpoint_thread) {
                error!("{}", err);
                self.state.fail();
                return Err(err).context("Failed to start checkpoint threads");
            }
        }

        let start = Instant::now();
        workload::run_workload(shared)?;
        let report = RunReport::collect(&self.state, start.elapsed());

        text::print_results(&report);
        if config.store.home.is_dir() {
            json::write_json(&report, &config.store.home.join(LATENCY_FILE))?;
        }
        Ok(Some(report))
    }
}

fn create_table(conn: &Arc<dyn Connection>, config: &Config) -> Result<()> {
    let mut session = conn
        .open_session()
        .with_context(|| format!("Error opening a session on {}", config.store.home.display()))?;
    session
        .create(&config.uri(), &config.store.table_config)
        .with_context(|| format!("Error creating table {}", config.uri()))?;
    session.close()?;
    Ok(())
}

/// Record count of an existing table, taken from its last key
fn find_table_count(conn: &Arc<dyn Connection>, config: &Config) -> Result<u64> {
    let mut session = conn
        .open_session()
        .context("open_session failed finding existing table count")?;
    let mut cursor = session
        .open_cursor(&config.uri(), CursorOptions::default())
        .context("open_cursor failed finding existing table count")?;

    let count = match cursor.last().context("cursor last failed finding existing table count")? {
        SearchResult::Found => {
            let key = cursor.key()?;
            std::str::from_utf8(key)
                .ok()
                .and_then(|key| key.trim().parse::<u64>().ok())
                .with_context(|| {
                    format!(
                        "last key {:?} of {} is not a record number",
                        String::from_utf8_lossy(key),
                        config.uri()
                    )
                })
        }
        SearchResult::NotFound => Err(anyhow::anyhow!(
            "cursor last failed finding existing table count: {} is empty",
            config.uri()
        )),
    };

    cursor.close()?;
    session.close()?;
    count
}

//! Per-thread operation schedules
//!
//! A worker does not decide per iteration what to run. It walks a fixed,
//! cyclic 100-slot [`Schedule`] built once before its loop starts.
//!
//! - Dedicated read, insert and update workers get a uniform schedule.
//! - Run-mix workers copy a shared template where the configured percentages
//!   of slots are inserts and updates and every other slot is a read.
//!
//! # Example
//!
//! ```
//! use kvpulse::worker::schedule::{OperationKind, Schedule};
//!
//! let schedule = Schedule::run_mix(10, 20, false)?;
//! assert_eq!(schedule.count(OperationKind::Insert), 10);
//! assert_eq!(schedule.count(OperationKind::Update), 20);
//! assert_eq!(schedule.count(OperationKind::Read), 70);
//! # Ok::<(), kvpulse::error::RunError>(())
//! ```

use crate::error::RunError;
use crate::stats::TrackKind;
use std::fmt;

/// Number of slots in every schedule
pub const SCHEDULE_SLOTS: usize = 100;

/// Operations a thread can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Read,
    Insert,
    /// Search first and require the key to be absent, then insert
    InsertRmw,
    Update,
    Checkpoint,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Insert => "insert",
            OperationKind::InsertRmw => "insert_rmw",
            OperationKind::Update => "update",
            OperationKind::Checkpoint => "checkpoint",
        }
    }

    /// Latency track the operation is accounted under
    pub fn track(&self) -> TrackKind {
        match self {
            OperationKind::Read => TrackKind::Read,
            OperationKind::Insert | OperationKind::InsertRmw => TrackKind::Insert,
            OperationKind::Update => TrackKind::Update,
            OperationKind::Checkpoint => TrackKind::Checkpoint,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, OperationKind::Insert | OperationKind::InsertRmw)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cyclic sequence of operations owned by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    slots: [OperationKind; SCHEDULE_SLOTS],
}

impl Schedule {
    /// Every slot runs `op`
    pub fn uniform(op: OperationKind) -> Self {
        Self {
            slots: [op; SCHEDULE_SLOTS],
        }
    }

    /// Template for run-mix workers
    ///
    /// `inserts` and `updates` are percentages; their sum must not exceed 100.
    /// Inserts are placed first so they spread out evenly, then updates fill
    /// the remaining read slots the same way.
    pub fn run_mix(inserts: u8, updates: u8, insert_rmw: bool) -> Result<Self, RunError> {
        if inserts as usize + updates as usize > SCHEDULE_SLOTS {
            return Err(RunError::InvalidSchedule(
                "insert and update percentages exceed 100",
            ));
        }

        let mut schedule = Self::uniform(OperationKind::Read);
        let insert_op = if insert_rmw {
            OperationKind::InsertRmw
        } else {
            OperationKind::Insert
        };
        schedule.spread(insert_op, inserts as usize)?;
        schedule.spread(OperationKind::Update, updates as usize)?;
        Ok(schedule)
    }

    /// Replace `count` read slots with `op`
    ///
    /// Walks the slots with a stride of `100 / count`; at each stop the next
    /// read slot at or after the stop (wrapping) is overwritten.
    fn spread(&mut self, op: OperationKind, count: usize) -> Result<(), RunError> {
        if count == 0 {
            return Ok(());
        }
        let jump = SCHEDULE_SLOTS / count;

        let mut p = 0;
        for _ in 0..count {
            let mut scanned = 0;
            while self.slots[p] != OperationKind::Read {
                p = (p + 1) % SCHEDULE_SLOTS;
                scanned += 1;
                if scanned >= SCHEDULE_SLOTS {
                    return Err(RunError::InvalidSchedule("no read slot left to replace"));
                }
            }
            self.slots[p] = op;

            p = if p + jump >= SCHEDULE_SLOTS { 0 } else { p + jump };
        }
        Ok(())
    }

    /// Operation at `slot`, wrapping around the schedule
    #[inline]
    pub fn get(&self, slot: usize) -> OperationKind {
        self.slots[slot % SCHEDULE_SLOTS]
    }

    /// Number of slots holding `op`
    pub fn count(&self, op: OperationKind) -> usize {
        self.slots.iter().filter(|&&s| s == op).count()
    }

    pub fn slots(&self) -> &[OperationKind] {
        &self.slots
    }
}

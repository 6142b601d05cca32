//! Random key distributions
//!
//! Workers pick the key of every read and update (and of inserts when a random
//! range is configured) from a distribution over the live key range.
//!
//! # Distributions
//!
//! - **Uniform**: Equal probability for every key (default)
//! - **Pareto**: 80/20 hot/cold skew towards the low end of the range
//!
//! # Key Numbering
//!
//! Keys are numbered from 1. A distribution returns a key number in
//! `[1, range]`; 0 is reserved because the store orders the all-zero key
//! specially. The worker formats the number into a zero-padded key string.
//!
//! # Example
//!
//! ```
//! use kvpulse::distribution::{Distribution, uniform::UniformDistribution};
//!
//! let mut dist = UniformDistribution::new();
//! let key = dist.next_key(1024);
//! assert!((1..=1024).contains(&key));
//! ```

pub mod pareto;
pub mod uniform;

use crate::config::Config;

/// Key number generator
///
/// # Thread Safety
///
/// Distributions must be `Send` to move into worker threads. Each worker owns
/// its own instance, so there is no shared RNG state.
pub trait Distribution: Send {
    /// Next key number in `[1, range]`
    ///
    /// Returns 0 when `range` is 0: there is nothing to pick from.
    fn next_key(&mut self, range: u64) -> u64;
}

/// Number of keys a random pick may currently land on
///
/// With a random range configured the key space is fixed at
/// `icount + random_range`. Otherwise it grows with the insert counter; the
/// last `insert_threads + 1` claimed keys are excluded since their inserts may
/// still be in flight.
pub fn value_range(config: &Config, insert_key: u64) -> u64 {
    let icount = config.populate.icount;
    if config.workload.random_range != 0 {
        return icount.saturating_add(config.workload.random_range);
    }
    let in_flight = config.workload.insert_threads as u64 + 1;
    icount.saturating_add(insert_key.saturating_sub(in_flight))
}

/// Distribution selected by the configuration
pub fn from_config(config: &Config) -> Box<dyn Distribution> {
    if config.workload.pareto {
        Box::new(pareto::ParetoDistribution::new())
    } else {
        Box::new(uniform::UniformDistribution::new())
    }
}

//! Pareto hot/cold distribution
//!
//! Draws `U` uniformly from `[0, 1)` and maps it through the Pareto inverse
//! CDF with shape 1.5, scaled so roughly 80% of picks land in the lowest 20% of
//! the key range:
//!
//! ```text
//! X = ((1 - U)^(-1/shape) - 1) * range * 0.2 * (shape - 1)
//! ```
//!
//! About 2-3% of draws overshoot the range. They are clamped to `range`, which
//! the `% range + 1` normalization folds onto key 1, so key 1 is the single
//! hottest key.
//!
//! # Example
//!
//! ```
//! use kvpulse::distribution::{Distribution, pareto::ParetoDistribution};
//!
//! let mut dist = ParetoDistribution::with_seed(7);
//! let key = dist.next_key(1_000_000);
//! assert!((1..=1_000_000).contains(&key));
//! ```

use super::Distribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Shape parameter of the hot/cold distribution
pub const PARETO_SHAPE: f64 = 1.5;

/// Fraction of the key range holding the hot keys
const HOT_FRACTION: f64 = 0.2;

/// Pareto distribution for 80/20 access patterns
pub struct ParetoDistribution {
    rng: Xoshiro256PlusPlus,
}

impl ParetoDistribution {
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a new Pareto distribution with specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Map a uniform draw in `[0, 1)` onto `[0, range]`
    fn transform(u: f64, range: u64) -> u64 {
        let scale = range as f64 * HOT_FRACTION * (PARETO_SHAPE - 1.0);
        let x = ((1.0 - u).powf(-1.0 / PARETO_SHAPE) - 1.0) * scale;
        if x >= range as f64 {
            range
        } else {
            x as u64
        }
    }
}

impl Default for ParetoDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Distribution for ParetoDistribution {
    #[inline]
    fn next_key(&mut self, range: u64) -> u64 {
        if range == 0 {
            return 0;
        }
        let u: f64 = self.rng.gen();
        Self::transform(u, range) % range + 1
    }
}

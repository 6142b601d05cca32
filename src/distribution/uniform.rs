//! Uniform random distribution
//!
//! Every key in the range is equally likely. Uses the xoshiro256++ PRNG, which
//! is fast enough to sit on the per-operation path.
//!
//! # Example
//!
//! ```
//! use kvpulse::distribution::{Distribution, uniform::UniformDistribution};
//!
//! let mut dist = UniformDistribution::new();
//! for _ in 0..10 {
//!     let key = dist.next_key(1024);
//!     assert!((1..=1024).contains(&key));
//! }
//! ```

use super::Distribution;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Uniform random distribution
pub struct UniformDistribution {
    rng: Xoshiro256PlusPlus,
}

impl UniformDistribution {
    /// Create a new uniform distribution with random seed
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a new uniform distribution with specific seed
    ///
    /// Useful for reproducible tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Default for UniformDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Distribution for UniformDistribution {
    #[inline(always)]
    fn next_key(&mut self, range: u64) -> u64 {
        if range == 0 {
            return 0;
        }
        self.rng.gen::<u64>() % range + 1
    }
}

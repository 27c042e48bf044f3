//! Deterministic random number generation.
//!
//! All stochastic decisions in a run flow through a single [`SimRng`] seeded
//! from the configuration. Same seed, same inputs, same run.

use std::fmt;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// Seeded random number generator for reproducible simulation.
#[derive(Clone)]
pub struct SimRng {
    inner: SmallRng,
    seed: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A uniform draw from `[0, 1)`.
    pub fn factor(&mut self) -> f64 {
        self.inner.gen_range(0.0..1.0)
    }
}

impl fmt::Debug for SimRng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimRng").field("seed", &self.seed).finish()
    }
}

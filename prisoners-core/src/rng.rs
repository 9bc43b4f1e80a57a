//! Per-worker random number streams.
//!
//! Every worker owns one [`RandomSource`], seeded exactly once from the
//! operating system entropy pool. Nothing is shared between workers.

use std::sync::Arc;

use rand::{
    Rng, RngCore, SeedableRng,
    rngs::{OsRng, SmallRng},
};
use tracing::{debug, error};

use crate::{Result, error::SimulationError};

/// A source of uniformly distributed indices.
///
/// Trials only need bounded draws, so they depend on this trait rather than a
/// concrete generator. Tests replay scripted draw sequences through it.
pub trait BoundedDraw {
    /// Returns a value drawn uniformly from `[0, bound]`, inclusive.
    fn next(&mut self, bound: usize) -> usize;
}

impl<T: BoundedDraw + ?Sized> BoundedDraw for &mut T {
    fn next(&mut self, bound: usize) -> usize {
        (**self).next(bound)
    }
}

/// Random stream owned by a single worker.
///
/// # Examples
/// ```
/// use prisoners_core::{BoundedDraw, RandomSource};
///
/// let mut rng = RandomSource::from_seed(7);
/// let draw = rng.next(9);
/// assert!(draw <= 9);
/// assert_eq!(rng.seed_value(), 7);
/// ```
#[derive(Clone, Debug)]
pub struct RandomSource {
    seed: u64,
    rng: SmallRng,
}

impl RandomSource {
    /// Seeds a new stream with one value read from the OS entropy source.
    ///
    /// # Errors
    /// Returns [`SimulationError::Entropy`] when the entropy source cannot be
    /// read. No fallback seed is used.
    pub fn seed() -> Result<Self> {
        let mut bytes = [0_u8; 8];
        OsRng.try_fill_bytes(&mut bytes).map_err(|err| {
            error!(error = %err, "entropy source unavailable");
            SimulationError::Entropy {
                message: Arc::from(err.to_string()),
            }
        })?;
        let seed = u64::from_le_bytes(bytes);
        debug!(seed, "seeded random source from OS entropy");
        Ok(Self::from_seed(seed))
    }

    /// Builds a deterministic stream from an explicit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// The seed this stream was created from.
    #[must_use]
    pub fn seed_value(&self) -> u64 {
        self.seed
    }
}

impl BoundedDraw for RandomSource {
    fn next(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..=bound)
    }
}

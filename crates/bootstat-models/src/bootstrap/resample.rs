//! Uniform resampling of row indices with replacement

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use bootstat_core::data::DataFrame;

use crate::base::{ModelError, Result};

/// Seed of the random stream for iteration `counter` of a run seeded with
/// `seed`.
///
/// SplitMix64 finalizer over the seed offset by the counter, so adjacent
/// iterations get well separated streams.
pub fn counter_seed(seed: u64, counter: u64) -> u64 {
    let mut z = seed.wrapping_add(counter.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draws `n_resamples` index sequences of length `n_rows`, each uniform over
/// `[0, n_rows)` with replacement.
///
/// Iteration `i` always reads from its own `Xoshiro256PlusPlus` stream, so a
/// sequence can be regenerated alone and does not depend on the order in
/// which iterations are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    n_rows: usize,
    n_resamples: usize,
    seed: u64,
}

impl Resampler {
    pub fn new(n_rows: usize, n_resamples: usize, seed: u64) -> Result<Self> {
        if n_rows == 0 {
            return Err(ModelError::invalid("cannot resample an empty dataset"));
        }
        if n_resamples == 0 {
            return Err(ModelError::invalid("number of resamples must be at least 1"));
        }

        Ok(Self {
            n_rows,
            n_resamples,
            seed,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_resamples(&self) -> usize {
        self.n_resamples
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Row indices of resample `iteration`
    pub fn indices(&self, iteration: usize) -> Vec<usize> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_seed(self.seed, iteration as u64));
        (0..self.n_rows)
            .map(|_| rng.random_range(0..self.n_rows))
            .collect()
    }

    /// Gather resample `iteration` from `data`
    pub fn resample(&self, data: &DataFrame, iteration: usize) -> Result<DataFrame> {
        if data.nrows() != self.n_rows {
            return Err(ModelError::invalid(format!(
                "resampler was built for {} rows, dataset has {}",
                self.n_rows,
                data.nrows()
            )));
        }
        Ok(data.take_rows(&self.indices(iteration))?)
    }

    /// Every index sequence, in iteration order
    pub fn iter(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        (0..self.n_resamples).map(move |i| self.indices(i))
    }
}

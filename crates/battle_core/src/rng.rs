//! Injected pseudo-random number source.
//!
//! Every non-deterministic decision in the core draws from a [`Prng`]
//! passed in by the caller. One battle uses one stream; replays reseed
//! with the recorded seed and get the identical sequence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A deterministic source of floats in `[0, 1)`.
pub trait Prng {
    /// Next float in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

/// Seeded generator backed by [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    inner: StdRng,
}

impl SeededRng {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed this generator was created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl Prng for SeededRng {
    fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }
}

/// Pick an index in `0..len` with one draw. Returns `None` for empty ranges.
pub fn pick_index(rng: &mut dyn Prng, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let idx = (rng.next_f64() * len as f64).floor() as usize;
    Some(idx.min(len - 1))
}

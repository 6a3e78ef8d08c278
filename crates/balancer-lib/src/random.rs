//! Injectable randomness for cold-start forecasts and candidate selection

use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Source of uniform random values
pub trait RandomSource: Send + Sync {
    /// Uniform value in `[low, high]`
    fn uniform(&self, low: f64, high: f64) -> f64;

    /// Uniform index in `0..len`; `len` must be non-zero
    fn index(&self, len: usize) -> usize;
}

/// Thread-local generator, freshly seeded by the OS per thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        rand::rng().random_range(low..=high)
    }

    fn index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        rand::rng().random_range(0..len)
    }
}

/// Deterministic generator for reproducible runs and tests
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.lock().random_range(low..=high)
    }

    fn index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.lock().random_range(0..len)
    }
}

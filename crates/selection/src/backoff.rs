//! Jitter sources for randomized backoff.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Supplies the multiplicative jitter applied to each backoff delay.
///
/// Values must lie in `[1.0, 2.0)`; [`crate::RetryPolicy::backoff`] clamps
/// anything outside that range.
pub trait JitterSource: Send {
    /// Draw the jitter factor for the next backoff.
    fn next_jitter(&mut self) -> f64;
}

/// Uniform jitter drawn from a seeded ChaCha stream.
///
/// The same seed yields the same sequence of delays.
#[derive(Debug, Clone)]
pub struct SeededJitter {
    rng: ChaCha8Rng,
}

impl SeededJitter {
    /// Create a deterministic jitter source.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a jitter source seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl JitterSource for SeededJitter {
    fn next_jitter(&mut self) -> f64 {
        self.rng.gen_range(1.0..2.0)
    }
}

/// Constant jitter, for exact delay assertions.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn next_jitter(&mut self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_jitter_in_range_and_reproducible() {
        let mut a = SeededJitter::new(42);
        let mut b = SeededJitter::new(42);

        for _ in 0..1000 {
            let x = a.next_jitter();
            assert!((1.0..2.0).contains(&x));
            assert_eq!(x, b.next_jitter());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = SeededJitter::new(1);
        let mut b = SeededJitter::new(2);
        let xs: Vec<f64> = (0..8).map(|_| a.next_jitter()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.next_jitter()).collect();
        assert_ne!(xs, ys);
    }
}

//! xorshift64* random number generator
//!
//! Fast, deterministic 64-bit PRNG. Same seed → same sequence, which keeps
//! generated demand (and therefore whole scheduling runs) reproducible.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use courier_logistics_core::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let quantity = rng.range(1, 17); // [1, 17)
/// assert!((1..17).contains(&quantity));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        // xorshift state must never be zero
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let span = (max - min) as u64;
        min + (self.next() % span) as i64
    }

    /// Current state; `RngManager::new(state)` resumes the sequence
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Random f64 in [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        (self.next() >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Sample a Poisson-distributed count with mean `lambda`
    ///
    /// Knuth's multiplication method; fine for the small per-tick rates the
    /// demand generator uses. Non-positive or non-finite `lambda` yields 0.
    ///
    /// # Example
    /// ```
    /// use courier_logistics_core::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// assert_eq!(rng.poisson(0.0), 0);
    /// ```
    pub fn poisson(&mut self, lambda: f64) -> u64 {
        if !lambda.is_finite() || lambda <= 0.0 {
            return 0;
        }

        let limit = (-lambda).exp();
        let mut count = 0u64;
        let mut product = self.next_f64();
        while product > limit {
            count += 1;
            product *= self.next_f64();
        }
        count
    }

    /// Index drawn proportionally to `weights`
    ///
    /// Negative and non-finite weights count as zero. Returns `None` when no
    /// weight is positive.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let usable = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let total: f64 = weights.iter().copied().map(usable).sum();
        if total <= 0.0 {
            return None;
        }

        let mut target = self.next_f64() * total;
        let mut last_positive = None;
        for (index, weight) in weights.iter().copied().map(usable).enumerate() {
            if weight <= 0.0 {
                continue;
            }
            if target < weight {
                return Some(index);
            }
            target -= weight;
            last_positive = Some(index);
        }
        // Float rounding can leave a sliver past the last bucket
        last_positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0);
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        RngManager::new(1).range(5, 5);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = RngManager::new(99999);
        let mut b = RngManager::new(99999);
        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn test_next_f64_in_unit_interval() {
        let mut rng = RngManager::new(12345);
        for _ in 0..1000 {
            let value = rng.next_f64();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_poisson_mean_close_to_lambda() {
        let mut rng = RngManager::new(2024);
        let samples = 20_000;
        let total: u64 = (0..samples).map(|_| rng.poisson(2.0)).sum();
        let mean = total as f64 / samples as f64;
        assert!((mean - 2.0).abs() < 0.1, "poisson mean {} too far from 2.0", mean);
    }

    #[test]
    fn test_poisson_rejects_bad_lambda() {
        let mut rng = RngManager::new(1);
        assert_eq!(rng.poisson(-1.0), 0);
        assert_eq!(rng.poisson(f64::NAN), 0);
    }

    #[test]
    fn test_pick_weighted_skips_zero_weights() {
        let mut rng = RngManager::new(3);
        for _ in 0..200 {
            assert_eq!(rng.pick_weighted(&[0.0, 2.0, -1.0]), Some(1));
        }
        assert_eq!(rng.pick_weighted(&[0.0, 0.0]), None);
        assert_eq!(rng.pick_weighted(&[]), None);
    }
}

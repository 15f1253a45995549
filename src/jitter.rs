//! Jitter applied on top of a [`crate::Backoff`] curve.

use rand::Rng;
use std::time::Duration;

/// Randomization applied to a computed backoff delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    /// No jitter - use the exact backoff delay.
    None,
    /// Multiply the delay by `1 + U` where `U` is drawn uniformly from
    /// `[0, max_fraction)`. This is the "honour the computed delay, then
    /// pad it a little" style used by the retry engine, as opposed to
    /// jitter strategies that replace the delay with a random value in
    /// some range.
    Percent {
        /// Upper bound (exclusive) of the uniform draw, e.g. `0.25` for
        /// "up to 25% extra".
        max_fraction: f64,
    },
}

impl Jitter {
    /// 25% multiplicative jitter, matching the retry engine's default.
    pub fn percent(max_fraction: f64) -> Self {
        Jitter::Percent { max_fraction }
    }

    /// Apply jitter to a delay duration using the thread-local RNG.
    pub fn apply(&self, delay: Duration) -> Duration {
        self.apply_with_rng(delay, &mut rand::rng())
    }

    /// Apply jitter with a caller-supplied RNG (for deterministic tests).
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Percent { max_fraction } => {
                if *max_fraction <= 0.0 {
                    return delay;
                }
                let u: f64 = rng.random_range(0.0..*max_fraction);
                delay.mul_f64(1.0 + u)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn none_jitter_returns_exact_delay() {
        let delay = Duration::from_secs(1);
        assert_eq!(Jitter::None.apply(delay), delay);
    }

    #[test]
    fn percent_jitter_never_shrinks_the_delay() {
        let delay = Duration::from_millis(1000);
        for _ in 0..200 {
            let jittered = Jitter::percent(0.25).apply(delay);
            assert!(jittered >= delay);
            assert!(jittered <= delay.mul_f64(1.25));
        }
    }

    #[test]
    fn percent_jitter_with_deterministic_rng() {
        let mut rng = StdRng::seed_from_u64(7);
        let delay = Duration::from_millis(1000);
        let jittered = Jitter::percent(0.25).apply_with_rng(delay, &mut rng);
        assert!(jittered >= delay);
        assert!(jittered <= delay.mul_f64(1.25));
    }

    #[test]
    fn zero_max_fraction_is_a_no_op() {
        let delay = Duration::from_millis(500);
        assert_eq!(Jitter::percent(0.0).apply(delay), delay);
    }
}

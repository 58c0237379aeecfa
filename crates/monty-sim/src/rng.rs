use serde::{Deserialize, Serialize};

use crate::config::Seed;

/// Source of uniform draws consumed by the trial engine.
///
/// Every draw the engine makes goes through [`RandomSource::next_f64`], so two
/// sources that yield the same `f64` sequence yield the same trials.
pub trait RandomSource {
    /// Next value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Next integer in `[0, max)`, computed as `floor(next_f64() * max)`.
    ///
    /// Returns 0 when `max` is 0.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn next_int(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        let scaled = (self.next_f64() * max as f64).floor() as usize;
        scaled.min(max - 1)
    }
}

/// Tiny deterministic RNG used by the simulator.
///
/// A 64-bit LCG with a SplitMix64 output finalizer. Reproducible across
/// platforms: equal seeds give bit-identical streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    seed: Seed,
    state: u64,
}

impl DeterministicRng {
    /// Create a new deterministic RNG from a seed.
    #[must_use]
    pub fn new(seed: Seed) -> Self {
        let state = initial_state(&seed);
        Self { seed, state }
    }

    /// Create an RNG seeded from OS entropy.
    ///
    /// The drawn seed is kept so the stream can be replayed later.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(Seed::Number(rand::random::<u64>()))
    }

    /// The seed this stream was (re)initialized with.
    #[must_use]
    pub const fn seed(&self) -> &Seed {
        &self.seed
    }

    /// Discard all state and restart the stream.
    ///
    /// `None` reseeds from OS entropy.
    pub fn reset(&mut self, seed: Option<Seed>) {
        *self = seed.map_or_else(Self::from_entropy, Self::new);
    }

    /// Next pseudo-random `u64`.
    #[must_use]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        splitmix_finalize(self.state)
    }
}

impl RandomSource for DeterministicRng {
    #[allow(clippy::cast_precision_loss)]
    fn next_f64(&mut self) -> f64 {
        // 53 high bits map exactly onto the f64 mantissa.
        (self.next_u64() >> 11) as f64 * (1.0 / (1_u64 << 53) as f64)
    }
}

/// Build a random source from an optional seed.
#[must_use]
pub fn create_random_source(seed: Option<Seed>) -> DeterministicRng {
    seed.map_or_else(DeterministicRng::from_entropy, DeterministicRng::new)
}

fn initial_state(seed: &Seed) -> u64 {
    fnv1a64(seed.canonical().as_bytes()) ^ 0x9E37_79B9_7F4A_7C15
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

const fn splitmix_finalize(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(seed: &str) -> Seed {
        Seed::Text(seed.to_string())
    }

    #[test]
    fn equal_seeds_give_identical_streams() {
        let mut a = DeterministicRng::new(text("12345"));
        let mut b = DeterministicRng::new(text("12345"));
        for _ in 0..1_000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn numeric_and_text_seed_are_equivalent() {
        let mut a = DeterministicRng::new(Seed::Number(12345));
        let mut b = DeterministicRng::new(text("12345"));
        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn distinct_seeds_diverge() {
        let mut a = DeterministicRng::new(text("12345"));
        let mut b = DeterministicRng::new(text("54321"));
        let sa: Vec<u64> = (0..16).map(|_| a.next_u64()).collect();
        let sb: Vec<u64> = (0..16).map(|_| b.next_u64()).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn reset_restarts_stream() {
        let mut rng = DeterministicRng::new(text("abc"));
        let first: Vec<u64> = (0..8).map(|_| rng.next_u64()).collect();
        rng.reset(Some(text("abc")));
        let second: Vec<u64> = (0..8).map(|_| rng.next_u64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn reset_without_seed_records_fresh_seed() {
        let mut rng = DeterministicRng::new(text("abc"));
        rng.reset(None);
        assert!(matches!(rng.seed(), Seed::Number(_)));

        let mut replay = DeterministicRng::new(rng.seed().clone());
        assert_eq!(rng.next_u64(), replay.next_u64());
    }

    #[test]
    fn next_f64_stays_in_unit_interval() {
        let mut rng = DeterministicRng::new(text("unit"));
        for _ in 0..10_000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x), "out of range: {x}");
        }
    }

    #[test]
    fn next_int_zero_is_zero() {
        let mut rng = DeterministicRng::new(text("zero"));
        assert_eq!(rng.next_int(0), 0);
    }

    #[test]
    fn next_int_is_roughly_uniform() {
        let mut rng = DeterministicRng::new(text("uniform"));
        let mut buckets = [0_u32; 5];
        let draws = 50_000;
        for _ in 0..draws {
            buckets[rng.next_int(5)] += 1;
        }
        for (i, count) in buckets.iter().enumerate() {
            let share = f64::from(*count) / f64::from(draws);
            assert!((share - 0.2).abs() < 0.01, "bucket {i} share {share:.4}");
        }
    }

    #[test]
    fn first_draw_for_reference_seed_is_stable() {
        let mut rng = DeterministicRng::new(text("12345"));
        assert_eq!(rng.next_u64(), 7_822_340_614_572_819_257);
    }

    #[test]
    fn fnv_matches_reference_vector() {
        // FNV-1a 64 of "a".
        assert_eq!(fnv1a64(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}

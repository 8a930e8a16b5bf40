#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded pseudo-random generator shared by wave and spawn logic.
//!
//! The string seed is hashed with SHA-256 and the digest keys a ChaCha8
//! stream. Both algorithms are fully specified, so the same seed and the same
//! call sequence reproduce the same values on every platform.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

const UNIT_SCALE: f64 = 1.0 / ((1u64 << 53) as f64);

/// Deterministic generator initialised from a string seed.
#[derive(Clone, Debug)]
pub struct SeededRng {
    seed: String,
    stream: ChaCha8Rng,
}

impl SeededRng {
    /// Creates a generator keyed by the SHA-256 digest of `seed`.
    #[must_use]
    pub fn new(seed: &str) -> Self {
        Self {
            seed: seed.to_owned(),
            stream: ChaCha8Rng::from_seed(derive_key(seed)),
        }
    }

    /// Seed the generator was created from.
    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Uniform float in `[0, 1)` built from the top 53 bits of the next word.
    pub fn next_unit(&mut self) -> f64 {
        let bits = self.stream.next_u64() >> 11;
        bits as f64 * UNIT_SCALE
    }

    /// Uniform integer in the inclusive range `[min, max]`.
    ///
    /// Collapses to `min` when `max <= min`.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = i128::from(max) - i128::from(min) + 1;
        let offset = ((self.next_unit() * span as f64).floor() as i128).min(span - 1);
        i64::try_from(i128::from(min) + offset).unwrap_or(max)
    }

    /// Uniform float in `[min, max)`.
    pub fn next_float(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_unit() * (max - min)
    }

    /// Returns `true` with probability `probability`.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }
}

fn derive_key(seed: &str) -> [u8; 32] {
    let digest = Sha256::digest(seed.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}
